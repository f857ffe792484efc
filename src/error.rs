//! Request-level errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Caller is anonymous or lacks the required capability
    #[error("You are not allowed to manage multilingual texts")]
    Unauthorized,

    /// Anti-forgery token missing, expired or scoped to another action
    #[error("The link you followed has expired")]
    InvalidToken,

    /// Request body could not be read
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Storage or other internal failure
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::InvalidToken => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller
    fn public_message(&self) -> String {
        match self {
            AppError::Internal(e) => {
                error!("Request failed: {:#}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), self.public_message()).into_response()
    }
}

/// Same errors, rendered as the AJAX failure payload.
#[derive(Debug)]
pub struct AjaxError(pub AppError);

impl From<AppError> for AjaxError {
    fn from(err: AppError) -> Self {
        AjaxError(err)
    }
}

impl IntoResponse for AjaxError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        let body = json!({
            "success": false,
            "data": { "message": self.0.public_message() },
        });
        (status, Json(body)).into_response()
    }
}
