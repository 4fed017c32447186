use crate::models::analysis::{GapItem, RecommendationType};

const COURSE_SITES: &str = "site:imooc.com OR site:bilibili.com";
const PROJECT_SITES: &str = "site:github.com";

/// External search reference opened alongside a new learning task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearningResource {
    pub skill: String,
    pub kind: RecommendationType,
    pub url: String,
}

impl LearningResource {
    pub fn for_gap(search_base_url: &str, gap: &GapItem) -> Self {
        Self {
            skill: gap.missing_skill.trim().to_string(),
            kind: gap.recommendation_type,
            url: search_url(search_base_url, &gap.missing_skill, gap.recommendation_type),
        }
    }
}

/// Course search unless a project is recommended.
pub fn search_url(search_base_url: &str, skill: &str, kind: RecommendationType) -> String {
    let skill = skill.trim();
    let query = match kind {
        RecommendationType::Project => format!("{skill} project tutorial {PROJECT_SITES}"),
        RecommendationType::Course | RecommendationType::Unspecified => {
            format!("learn {skill} {COURSE_SITES}")
        }
    };
    format!(
        "{}?q={}",
        search_base_url.trim_end_matches('?'),
        urlencoding::encode(&query)
    )
}

/// Opens a `LearningResource` somewhere the user can see it.
///
/// Fire-and-forget: implementations must return without waiting on the user
/// or the network.
pub trait ResourceLauncher: Send + Sync {
    fn open(&self, resource: &LearningResource);
}
