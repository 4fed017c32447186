use std::str::FromStr;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::ids::{JdId, ResumeId};
use crate::models::timestamp;

/// Category → raw score entry, in document order. Entries stay untyped here;
/// `analysis::normalizer` is the only place that interprets them.
pub type RadarScores = IndexMap<String, Value>;

/// Markers the backend puts in `missing_skill` when résumé or JD parsing failed.
const INCOMPLETE_DATA_MARKERS: &[&str] = &["数据不完整", "incomplete data"];

/// `POST /jds` body.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewJobDescription {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub description: String,
}

/// `POST /jds` response.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedJobDescription {
    pub id: JdId,
    #[serde(default)]
    pub extracted_title: Option<String>,
}

/// `POST /gap-analysis` body.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct GapAnalysisRequest {
    pub resume_id: ResumeId,
    pub jd_id: JdId,
    /// `false` lets the backend return a cached result for an unchanged résumé.
    pub force_analyze: bool,
}

/// `POST /gap-analysis` response, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GapResult {
    pub overall_score: f64,
    #[serde(default)]
    pub radar_data: RadarScores,
    #[serde(default)]
    pub gap_details: Vec<GapItem>,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Importance {
    High,
    Medium,
    Low,
}

impl FromStr for Importance {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" | "高" => Ok(Importance::High),
            "medium" | "中" => Ok(Importance::Medium),
            "low" | "低" => Ok(Importance::Low),
            other => Err(format!("unknown importance '{other}'")),
        }
    }
}

impl<'de> Deserialize<'de> for Importance {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Importance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Importance::High => "High",
            Importance::Medium => "Medium",
            Importance::Low => "Low",
        };
        f.write_str(label)
    }
}

/// What kind of remediation the backend suggests. Drives the search link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    Course,
    Project,
    #[default]
    #[serde(other)]
    Unspecified,
}

/// One missing-skill entry of a gap report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GapItem {
    pub missing_skill: String,
    pub importance: Importance,
    #[serde(default)]
    pub recommendation: String,
    #[serde(default)]
    pub recommendation_type: RecommendationType,
}

impl GapItem {
    /// True for the backend's "incomplete data" placeholder. Such items are
    /// informational only: never actionable, never turned into tasks.
    pub fn is_data_quality_notice(&self) -> bool {
        let lowered = self.missing_skill.to_lowercase();
        INCOMPLETE_DATA_MARKERS
            .iter()
            .any(|marker| lowered.contains(marker))
    }
}

/// A course the user finished before a historical analysis was run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletedCourse {
    pub skill: String,
    #[serde(default)]
    pub course_title: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: Option<String>,
}

/// One row of `GET /history`, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub id: i64,
    pub resume_id: ResumeId,
    pub jd_id: JdId,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub job_title: Option<String>,
    pub overall_score: f64,
    #[serde(default)]
    pub radar_data: RadarScores,
    #[serde(default)]
    pub gap_details: Vec<GapItem>,
    #[serde(default)]
    pub completed_courses: Vec<CompletedCourse>,
}

impl HistoryEntry {
    /// The analysis part of the row, in the same shape `/gap-analysis` returns.
    pub fn gap_result(&self) -> GapResult {
        GapResult {
            overall_score: self.overall_score,
            radar_data: self.radar_data.clone(),
            gap_details: self.gap_details.clone(),
            summary: String::new(),
        }
    }
}
