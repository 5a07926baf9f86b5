use axum::http::StatusCode;
use thiserror::Error;

/// Failures of the scorecard core, independent of how they reach the user.
#[derive(Error, Debug)]
pub enum ScorecardError {
    #[error("{0}")]
    Validation(String),

    #[error("confirmation required: {0}")]
    NotConfirmed(&'static str),

    #[error("nothing to sync: current week and history are empty")]
    NoData,

    #[error("sync is not configured: {0}")]
    MissingConfig(&'static str),

    #[error("GitHub API error: {status}")]
    Remote { status: u16 },

    #[error("remote {file} is not a valid document: {reason}")]
    InvalidRemote { file: &'static str, reason: String },

    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("a sync is already in progress")]
    SyncInProgress,

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScorecardError>;

impl ScorecardError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl From<ScorecardError> for AppError {
    fn from(err: ScorecardError) -> Self {
        let status = match &err {
            ScorecardError::Validation(_) => StatusCode::BAD_REQUEST,
            ScorecardError::NotConfirmed(_) => StatusCode::PRECONDITION_REQUIRED,
            ScorecardError::NoData => StatusCode::UNPROCESSABLE_ENTITY,
            ScorecardError::MissingConfig(_) => StatusCode::PRECONDITION_FAILED,
            ScorecardError::Remote { .. }
            | ScorecardError::InvalidRemote { .. }
            | ScorecardError::Transport(_) => StatusCode::BAD_GATEWAY,
            ScorecardError::SyncInProgress => StatusCode::CONFLICT,
            ScorecardError::Storage(_) | ScorecardError::Json(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
