use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use roster_append::AppendError;
use roster_store::StoreError;
use roster_types::ValidationError;
use serde_json::json;
use thiserror::Error;

/// Message returned for any append failure; the cause only goes to the log.
pub const SAVE_FAILED: &str = "failed to save submission";

/// Message returned when the append was cancelled or ran out of time.
pub const SAVE_TIMED_OUT: &str = "timed out saving submission";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid request body: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("append failed: {0}")]
    Append(#[from] AppendError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Invalid(_) => StatusCode::BAD_REQUEST,
            Self::Append(e) if e.is_cancelled() => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to show to the submitter.
    pub fn public_message(&self) -> String {
        match self {
            Self::BadRequest(_) | Self::Invalid(_) => self.to_string(),
            Self::Append(e) if e.is_cancelled() => SAVE_TIMED_OUT.to_string(),
            _ => SAVE_FAILED.to_string(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "ok": false, "message": self.public_message() }));
        (self.status(), body).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
