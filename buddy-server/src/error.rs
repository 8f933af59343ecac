//! JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use buddy_auth::AuthError;
use buddy_rag::RagError;
use serde_json::json;
use tracing::error;

/// An error returned to the client as `{"status":"error","message":..,"error":..}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub error: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), error: None }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>, error: impl ToString) -> Self {
        Self { error: Some(error.to_string()), ..Self::new(StatusCode::INTERNAL_SERVER_ERROR, message) }
    }

    /// Map a pipeline failure. Client mistakes become 400, the rest 500
    /// with `message` as the headline.
    pub fn from_rag(message: &str, err: RagError) -> Self {
        match err {
            RagError::UnsupportedFormat(_) => {
                Self::bad_request("Unsupported file format. Please upload a PDF, DOCX or TXT file.")
            }
            RagError::EmptyDocument(_) | RagError::ExtractionError { .. } => {
                Self { error: Some(err.to_string()), ..Self::bad_request("Could not extract text from the file") }
            }
            RagError::NoDocuments => Self::bad_request(err.to_string()),
            other => {
                error!(error = %other, context = message, "request failed");
                Self::internal(message, other)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "status": "error", "message": self.message });
        if let Some(error) = self.error {
            body["error"] = json!(error);
        }
        (self.status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UsernameTaken | AuthError::EmailTaken | AuthError::Validation(_) => {
                Self::bad_request(err.to_string())
            }
            AuthError::InvalidCredentials => Self::new(StatusCode::UNAUTHORIZED, err.to_string()),
            AuthError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "User not found"),
            AuthError::Database(e) => {
                error!(error = %e, "database error");
                Self::internal("Database error", e)
            }
        }
    }
}
