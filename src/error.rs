use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::sink::SinkError;

#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    #[error("auth error")]
    Auth,
    #[error("shutting down, not accepting pushes")]
    Draining,
    #[error("invalid JSON received: {0}")]
    MalformedRequest(#[source] serde_json::Error),
    #[error("malformed record: {0}")]
    MalformedRecord(String),
    #[error("field `{field}` cannot be stored as a float: {reason}")]
    FieldCoercion { field: String, reason: String },
    #[error("sink write failed: {0}")]
    SinkWrite(#[from] SinkError),
}

impl IngestError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        IngestError::MalformedRecord(msg.into())
    }

    /// Label used for the rejection counter.
    pub fn reason(&self) -> &'static str {
        match self {
            IngestError::Auth => "auth",
            IngestError::Draining => "draining",
            IngestError::MalformedRequest(_) => "invalid_json",
            IngestError::MalformedRecord(_) => "malformed_record",
            IngestError::FieldCoercion { .. } => "field_coercion",
            IngestError::SinkWrite(_) => "sink_write",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            IngestError::Auth => StatusCode::FORBIDDEN,
            IngestError::Draining => StatusCode::SERVICE_UNAVAILABLE,
            IngestError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            IngestError::MalformedRecord(_) | IngestError::FieldCoercion { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            IngestError::SinkWrite(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            IngestError::Auth => json!({ "detail": "Auth Error" }),
            IngestError::MalformedRequest(_) => {
                json!({ "message": "Invalid JSON Received", "error_code": 400 })
            }
            other => json!({ "message": other.to_string(), "error_code": status.as_u16() }),
        };
        (status, Json(body)).into_response()
    }
}
