//! Match API client: the single point of entry for every backend call.
//!
//! ARCHITECTURAL RULE: workflow modules talk to the backend only through the
//! `MatchApi` trait. `HttpMatchApi` is the production implementation; tests
//! swap in an in-memory fake.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::analysis::{
    CreatedJobDescription, GapAnalysisRequest, GapResult, HistoryEntry, NewJobDescription,
};
use crate::models::ids::{ResumeId, TaskId, UserId};
use crate::models::resume::{
    ResumeProfile, ResumeSummary, ResumeSyncRequest, ResumeUpload, SyncAck, UploadedResume,
};
use crate::models::task::{CompletionReceipt, CompletionRequest, CreatedTask, LearningTask, NewTask};
use crate::models::user::UserAccount;

const MAX_GET_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 250;
const PDF_MIME: &str = "application/pdf";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Status { status: u16, message: String },

    /// 401 from the backend, or no bearer token configured at all.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The backend answered 200 but reported a failure in the body.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// The remote collaborator. One method per endpoint the workflow uses.
#[async_trait]
pub trait MatchApi: Send + Sync {
    async fn current_user(&self) -> Result<UserAccount, ApiError>;

    async fn upload_resume(
        &self,
        user_id: UserId,
        upload: &ResumeUpload,
    ) -> Result<UploadedResume, ApiError>;

    async fn list_resumes(&self) -> Result<Vec<ResumeSummary>, ApiError>;

    /// `Ok(None)` when the user has no résumé yet (404 is not an error).
    async fn current_resume(&self, user_id: UserId) -> Result<Option<ResumeProfile>, ApiError>;

    async fn submit_job_description(
        &self,
        jd: &NewJobDescription,
    ) -> Result<CreatedJobDescription, ApiError>;

    async fn gap_analysis(&self, request: &GapAnalysisRequest) -> Result<GapResult, ApiError>;

    async fn history(&self) -> Result<Vec<HistoryEntry>, ApiError>;

    async fn create_task(&self, task: &NewTask) -> Result<CreatedTask, ApiError>;

    async fn list_tasks(&self, user_id: UserId) -> Result<Vec<LearningTask>, ApiError>;

    async fn complete_task(&self, task_id: TaskId) -> Result<CompletionReceipt, ApiError>;

    async fn update_resume_from_task(
        &self,
        task_id: TaskId,
        resume_id: ResumeId,
    ) -> Result<SyncAck, ApiError>;
}

/// reqwest-backed `MatchApi`. Attaches the bearer token to every call.
#[derive(Clone)]
pub struct HttpMatchApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpMatchApi {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn token(&self) -> Result<&str, ApiError> {
        self.token.as_deref().ok_or(ApiError::Unauthorized)
    }

    /// GET with retry on transport errors and 5xx: 250ms, then 500ms.
    /// Only GETs retry; a retried POST could duplicate a task.
    async fn get(&self, path: &str) -> Result<Response, ApiError> {
        let token = self.token()?;
        let url = self.url(path);
        let mut attempt = 1;

        loop {
            let error = match self.client.get(&url).bearer_auth(token).send().await {
                Ok(response) if !response.status().is_server_error() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    warn!("GET {} returned {}: {}", path, status, body);
                    ApiError::Status {
                        status: status.as_u16(),
                        message: error_detail(&body),
                    }
                }
                Err(e) => ApiError::Http(e),
            };
            if attempt >= MAX_GET_ATTEMPTS {
                return Err(error);
            }

            let delay = Duration::from_millis(RETRY_BASE_DELAY_MS * (1 << (attempt - 1)));
            warn!(
                "GET {} attempt {} failed, retrying after {}ms...",
                path,
                attempt,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.get(path).await?;
        read_json(path, response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let token = self.token()?;
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        read_json(path, response).await
    }
}

#[async_trait]
impl MatchApi for HttpMatchApi {
    async fn current_user(&self) -> Result<UserAccount, ApiError> {
        self.get_json("/users/me").await
    }

    async fn upload_resume(
        &self,
        user_id: UserId,
        upload: &ResumeUpload,
    ) -> Result<UploadedResume, ApiError> {
        let token = self.token()?;
        let form = Form::new().text("user_id", user_id.to_string()).part(
            "file",
            Part::bytes(upload.bytes.to_vec())
                .file_name(upload.file_name.clone())
                .mime_str(PDF_MIME)?,
        );

        debug!(
            "Uploading résumé '{}' ({} bytes)",
            upload.file_name,
            upload.bytes.len()
        );

        let response = self
            .client
            .post(self.url("/resumes/upload"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;
        read_json("/resumes/upload", response).await
    }

    async fn list_resumes(&self) -> Result<Vec<ResumeSummary>, ApiError> {
        self.get_json("/resumes/list").await
    }

    async fn current_resume(&self, user_id: UserId) -> Result<Option<ResumeProfile>, ApiError> {
        let path = format!("/resumes/{user_id}");
        let response = self.get(&path).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("No résumé stored yet for user {user_id}");
            return Ok(None);
        }
        read_json(&path, response).await.map(Some)
    }

    async fn submit_job_description(
        &self,
        jd: &NewJobDescription,
    ) -> Result<CreatedJobDescription, ApiError> {
        self.post_json("/jds", jd).await
    }

    async fn gap_analysis(&self, request: &GapAnalysisRequest) -> Result<GapResult, ApiError> {
        let body: Value = self.post_json("/gap-analysis", request).await?;

        // The scorer reports its own failures as a 200 with an `error` field.
        if let Some(message) = body.get("error").and_then(Value::as_str) {
            if body.get("overall_score").is_none() {
                return Err(ApiError::Backend(message.to_string()));
            }
        }

        Ok(serde_json::from_value(body)?)
    }

    async fn history(&self) -> Result<Vec<HistoryEntry>, ApiError> {
        self.get_json("/history").await
    }

    async fn create_task(&self, task: &NewTask) -> Result<CreatedTask, ApiError> {
        self.post_json("/tasks", task).await
    }

    async fn list_tasks(&self, user_id: UserId) -> Result<Vec<LearningTask>, ApiError> {
        self.get_json(&format!("/tasks/{user_id}")).await
    }

    async fn complete_task(&self, task_id: TaskId) -> Result<CompletionReceipt, ApiError> {
        self.post_json("/tasks/complete", &CompletionRequest::new(task_id))
            .await
    }

    async fn update_resume_from_task(
        &self,
        task_id: TaskId,
        resume_id: ResumeId,
    ) -> Result<SyncAck, ApiError> {
        self.post_json(
            "/resumes/update-from-task",
            &ResumeSyncRequest { task_id, resume_id },
        )
        .await
    }
}

/// Maps the status line and decodes a successful body.
async fn read_json<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, ApiError> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
        warn!("{} rejected the bearer token", path);
        return Err(ApiError::Unauthorized);
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: error_detail(&body),
        });
    }

    let bytes = response.bytes().await?;
    debug!("{} succeeded with {} bytes", path, bytes.len());
    Ok(serde_json::from_slice(&bytes)?)
}

/// Extracts FastAPI's `{"detail": ...}` message, falling back to the raw body.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => match value.get("detail") {
            Some(Value::String(detail)) => detail.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        Err(_) => body.to_string(),
    }
}
