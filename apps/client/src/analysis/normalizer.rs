//! Score Normalizer: turns the backend's radar map into uniform
//! (user, target) pairs for the visualization layer.
//!
//! Two representations reach the client:
//! - legacy scalar `v` → user score `v`, target 100 (no target data means the
//!   gap reads as user shortfall only)
//! - pair `{ "user": u, "target": t }` → mapped directly
//!
//! Any other entry fails the whole normalization. A partially-normalized
//! radar would be misleading.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::analysis::RadarScores;

/// Upper bound of every radar axis.
pub const FULL_MARK: f64 = 100.0;

#[derive(Debug, Clone, Error, PartialEq)]
#[error("score entry for '{category}' is malformed: {reason}")]
pub struct MalformedScoreData {
    pub category: String,
    pub reason: String,
}

impl MalformedScoreData {
    fn new(category: &str, reason: impl Into<String>) -> Self {
        Self {
            category: category.to_string(),
            reason: reason.into(),
        }
    }
}

/// A radar entry as it appears on the wire, after shape detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreEntry {
    Legacy(f64),
    Pair { user: f64, target: f64 },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WirePair {
    #[serde(alias = "user_score")]
    user: f64,
    #[serde(alias = "target_score")]
    target: f64,
}

impl ScoreEntry {
    /// Detects the representation of one raw entry.
    pub fn parse(category: &str, raw: &Value) -> Result<Self, MalformedScoreData> {
        let entry = match raw {
            Value::Number(n) => {
                let v = n
                    .as_f64()
                    .ok_or_else(|| MalformedScoreData::new(category, "number out of range"))?;
                ScoreEntry::Legacy(v)
            }
            Value::Object(_) => {
                let pair: WirePair = serde_json::from_value(raw.clone())
                    .map_err(|e| MalformedScoreData::new(category, e.to_string()))?;
                ScoreEntry::Pair {
                    user: pair.user,
                    target: pair.target,
                }
            }
            other => {
                return Err(MalformedScoreData::new(
                    category,
                    format!("expected a number or {{user, target}}, got {other}"),
                ))
            }
        };

        let (user, target) = entry.scores();
        check_bounds(category, "user score", user)?;
        check_bounds(category, "target score", target)?;
        Ok(entry)
    }

    /// `(user, target)` with the legacy target filled in.
    pub fn scores(self) -> (f64, f64) {
        match self {
            ScoreEntry::Legacy(v) => (v, FULL_MARK),
            ScoreEntry::Pair { user, target } => (user, target),
        }
    }
}

/// One normalized radar axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarPoint {
    pub category: String,
    pub user_score: f64,
    pub target_score: f64,
    pub full_mark: f64,
}

impl RadarPoint {
    /// How far the user is below the target; zero when met or exceeded.
    pub fn shortfall(&self) -> f64 {
        (self.target_score - self.user_score).max(0.0)
    }
}

/// Normalizes every category, preserving input order.
pub fn normalize_radar(radar: &RadarScores) -> Result<Vec<RadarPoint>, MalformedScoreData> {
    radar
        .iter()
        .map(|(category, raw)| {
            let (user_score, target_score) = ScoreEntry::parse(category, raw)?.scores();
            Ok(RadarPoint {
                category: category.clone(),
                user_score,
                target_score,
                full_mark: FULL_MARK,
            })
        })
        .collect()
}

/// Bounds check shared with the overall score.
pub fn check_bounds(category: &str, label: &str, value: f64) -> Result<(), MalformedScoreData> {
    if !value.is_finite() || !(0.0..=FULL_MARK).contains(&value) {
        return Err(MalformedScoreData::new(
            category,
            format!("{label} {value} is outside 0..=100"),
        ));
    }
    Ok(())
}
