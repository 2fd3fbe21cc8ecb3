use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::WorkflowError;

/// Body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "busy")]
    pub error: String,
    #[schema(example = "submission already in progress")]
    pub message: String,
}

#[derive(Debug, Display)]
pub enum ApiError {
    #[display(fmt = "{}", _0)]
    Workflow(WorkflowError),
    #[display(fmt = "session not found")]
    SessionNotFound,
    #[display(fmt = "student {} is not on the roster", _0)]
    StudentNotFound(String),
    #[display(fmt = "{}", _0)]
    BadRequest(String),
    #[display(fmt = "internal error: {}", _0)]
    Internal(String),
}

impl std::error::Error for ApiError {}

impl From<WorkflowError> for ApiError {
    fn from(e: WorkflowError) -> Self {
        ApiError::Workflow(e)
    }
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::Workflow(e) => e.code(),
            ApiError::SessionNotFound => "session_not_found",
            ApiError::StudentNotFound(_) => "student_not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Workflow(e) if e.is_upstream() => StatusCode::BAD_GATEWAY,
            ApiError::Workflow(WorkflowError::Busy(_)) => StatusCode::CONFLICT,
            ApiError::Workflow(WorkflowError::SessionClosed) => StatusCode::GONE,
            ApiError::Workflow(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::SessionNotFound | ApiError::StudentNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.code().to_string(),
            message: self.to_string(),
        })
    }
}
