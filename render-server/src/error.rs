//! HTTP error mapping

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use render_common::{ErrorResponse, ValidationErrorResponse};
use render_sandbox::{ErrorKind, JobFailure};
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationErrors),

    /// Body could not be read as a render request
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error(transparent)]
    Job(#[from] JobFailure),
}

/// Status code for a job failure kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::SandboxUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::ExecutionTimeout => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Job(failure) => status_for(failure.kind()),
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        match self {
            Self::Validation(errors) => response.json(ValidationErrorResponse::new(
                serde_json::to_value(errors).unwrap_or_default(),
            )),
            Self::InvalidBody(reason) => {
                response.json(ValidationErrorResponse::new(serde_json::json!({
                    "body": [{ "code": "invalid_body", "message": reason }],
                })))
            }
            Self::Job(failure) => response.json(ErrorResponse {
                message: failure.message(),
                kind: Some(failure.kind().to_string()),
                job_id: Some(failure.job_id),
            }),
        }
    }
}
