use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::ids::{ResumeId, TaskId};
use crate::models::timestamp;

/// A résumé file about to be sent to `POST /resumes/upload`.
#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

/// `POST /resumes/upload` response.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedResume {
    pub id: ResumeId,
    #[serde(default)]
    pub parsed_data: Option<Value>,
}

impl UploadedResume {
    /// Skills the backend parser found in the upload, if it reported any.
    pub fn parsed_skill_count(&self) -> Option<usize> {
        self.parsed_data
            .as_ref()?
            .get("skills")?
            .as_array()
            .map(Vec::len)
    }
}

/// One row of `GET /resumes/list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResumeSummary {
    pub id: ResumeId,
    pub name: String,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The structured résumé owned by the backend (`GET /resumes/{user_id}`).
///
/// Only the id and skill list are interpreted by the client; everything else
/// is carried opaquely for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResumeProfile {
    pub id: ResumeId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub skills: Vec<Value>,
    #[serde(default)]
    pub experience: Vec<Value>,
    #[serde(default)]
    pub projects: Vec<Value>,
    #[serde(default)]
    pub education: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResumeProfile {
    /// Skill names, ignoring entries the parser did not emit as strings.
    pub fn skill_names(&self) -> Vec<&str> {
        self.skills.iter().filter_map(Value::as_str).collect()
    }
}

/// `POST /resumes/update-from-task` body.
#[derive(Debug, Clone, Serialize)]
pub struct ResumeSyncRequest {
    pub task_id: TaskId,
    pub resume_id: ResumeId,
}

/// `POST /resumes/update-from-task` acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncAck {
    #[serde(default)]
    pub message: String,
}
