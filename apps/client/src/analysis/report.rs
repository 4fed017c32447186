use serde::Serialize;

use crate::analysis::normalizer::{check_bounds, normalize_radar, MalformedScoreData, RadarPoint};
use crate::models::analysis::{GapItem, GapResult};

/// A `GapResult` after ingestion: the radar is normalized once here, so
/// nothing downstream branches on the score representation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub overall_score: f64,
    pub radar: Vec<RadarPoint>,
    pub gaps: Vec<GapItem>,
    pub summary: String,
}

impl AnalysisReport {
    pub fn from_result(result: GapResult) -> Result<Self, MalformedScoreData> {
        check_bounds("overall", "overall score", result.overall_score)?;
        let radar = normalize_radar(&result.radar_data)?;

        Ok(Self {
            overall_score: result.overall_score,
            radar,
            gaps: result.gap_details,
            summary: result.summary,
        })
    }

    /// Gap items the user can act on; data-quality notices are excluded.
    pub fn actionable_gaps(&self) -> impl Iterator<Item = &GapItem> {
        self.gaps.iter().filter(|g| !g.is_data_quality_notice())
    }

    /// Data-quality notices, shown as information only.
    pub fn data_quality_notices(&self) -> impl Iterator<Item = &GapItem> {
        self.gaps.iter().filter(|g| g.is_data_quality_notice())
    }

    /// Looks up an actionable gap by skill name (trimmed, case-insensitive).
    pub fn find_gap(&self, skill: &str) -> Option<&GapItem> {
        let wanted = skill_key(skill);
        self.actionable_gaps()
            .find(|g| skill_key(&g.missing_skill) == wanted)
    }
}

/// Canonical form of a skill name for matching and guard keys.
pub fn skill_key(skill: &str) -> String {
    skill.trim().to_lowercase()
}
