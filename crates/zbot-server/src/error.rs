use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

// ---------------------------------------------------------------------------
// WebhookError: the only errors a webhook sender ever sees
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing or invalid webhook signature")]
    BadSignature,

    #[error("invalid webhook payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::BadSignature => StatusCode::UNAUTHORIZED,
            WebhookError::InvalidPayload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status(), axum::Json(body)).into_response()
    }
}
