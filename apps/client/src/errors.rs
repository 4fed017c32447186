use serde::Serialize;
use thiserror::Error;

use crate::analysis::normalizer::MalformedScoreData;
use crate::api::ApiError;

/// Workflow-level error type.
/// `to_notice` turns any variant into the message the presentation layer shows.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Caller input rejected before any remote call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Guard or duplicate-task check rejected the action.
    #[error("Duplicate action: {0}")]
    DuplicateAction(String),

    #[error("Remote call failed: {0}")]
    Remote(ApiError),

    #[error(transparent)]
    MalformedScoreData(#[from] MalformedScoreData),

    #[error("No active analysis session")]
    NoActiveSession,

    /// Missing token or a 401 from any call. The user must sign in again.
    #[error("Session is no longer valid")]
    SessionInvalid,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ApiError> for WorkflowError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized => WorkflowError::SessionInvalid,
            other => WorkflowError::Remote(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeSeverity {
    Info,
    Warning,
    Error,
}

/// A user-facing message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub severity: NoticeSeverity,
    pub code: &'static str,
    pub message: String,
    /// The same action may succeed if tried again.
    pub retryable: bool,
    /// Route the user to the login entry point.
    pub requires_login: bool,
}

impl Notice {
    fn new(severity: NoticeSeverity, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            retryable: false,
            requires_login: false,
        }
    }
}

impl WorkflowError {
    pub fn to_notice(&self) -> Notice {
        match self {
            WorkflowError::Validation(msg) => {
                Notice::new(NoticeSeverity::Warning, "VALIDATION_ERROR", msg.clone())
            }
            WorkflowError::DuplicateAction(msg) => {
                Notice::new(NoticeSeverity::Info, "DUPLICATE_ACTION", msg.clone())
            }
            WorkflowError::Remote(e) => {
                tracing::error!("Remote call failed: {e}");
                let message = match e {
                    ApiError::Status { message, .. } | ApiError::Backend(message) => {
                        format!("The server could not complete the request: {message}")
                    }
                    ApiError::Decode(e) => {
                        format!("The server sent a response this client could not read: {e}")
                    }
                    _ => "The server could not be reached. Please try again.".to_string(),
                };
                Notice {
                    retryable: true,
                    ..Notice::new(NoticeSeverity::Error, "REMOTE_ERROR", message)
                }
            }
            WorkflowError::MalformedScoreData(e) => {
                tracing::error!("Malformed score data: {e}");
                Notice::new(
                    NoticeSeverity::Error,
                    "MALFORMED_SCORE_DATA",
                    "The analysis result could not be displayed because its score data is malformed.",
                )
            }
            WorkflowError::NoActiveSession => Notice::new(
                NoticeSeverity::Warning,
                "NO_ACTIVE_SESSION",
                "Run an analysis with a résumé and a job description first.",
            ),
            WorkflowError::SessionInvalid => Notice {
                requires_login: true,
                ..Notice::new(
                    NoticeSeverity::Error,
                    "SESSION_INVALID",
                    "Your session has expired. Please sign in again.",
                )
            },
            WorkflowError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                Notice::new(
                    NoticeSeverity::Error,
                    "INTERNAL_ERROR",
                    "An internal error occurred",
                )
            }
        }
    }
}
