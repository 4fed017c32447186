use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::ids::{TaskId, UserId};
use crate::models::timestamp;

/// Forward-only task state. `Verified` is assigned by the backend once a
/// completed task has been written into a résumé; the client never sets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskStatus {
    Created,
    Completed,
    Verified,
}

impl TaskStatus {
    /// Closed tasks no longer block a new task for the same skill.
    pub fn is_closed(self) -> bool {
        matches!(self, TaskStatus::Verified)
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "in_progress" | "created" | "pending" => Ok(TaskStatus::Created),
            "completed" => Ok(TaskStatus::Completed),
            "verified" => Ok(TaskStatus::Verified),
            other => Err(serde::de::Error::custom(format!(
                "unknown task status '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TaskStatus::Created => "created",
            TaskStatus::Completed => "completed",
            TaskStatus::Verified => "verified",
        };
        f.write_str(label)
    }
}

/// One row of `GET /tasks/{user_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LearningTask {
    pub id: TaskId,
    pub skill: String,
    pub status: TaskStatus,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    pub created_at: Option<DateTime<Utc>>,
}

/// `POST /tasks` body.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewTask {
    pub user_id: UserId,
    pub skill_tag: String,
    pub recommendation: String,
}

/// `POST /tasks` response.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedTask {
    pub id: TaskId,
}

/// `POST /tasks/complete` body.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub task_id: TaskId,
    pub status: &'static str,
}

impl CompletionRequest {
    pub fn new(task_id: TaskId) -> Self {
        Self {
            task_id,
            status: "completed",
        }
    }
}

/// `POST /tasks/complete` response.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionReceipt {
    #[serde(default)]
    pub resume_suggestion: String,
    #[serde(default)]
    pub resume_updated: bool,
    #[serde(default)]
    pub gap_analysis_performed: bool,
}
