use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::error::MangoDeskError;

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Error body shared by every endpoint
#[derive(Debug, Serialize)]
struct ErrorPayload {
    success: bool,
    error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<MangoDeskError> for ApiError {
    fn from(err: MangoDeskError) -> Self {
        let status = match &err {
            MangoDeskError::NotFound(_) => StatusCode::NOT_FOUND,
            MangoDeskError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // provider messages are already caller-safe; storage and internal details are not
        let message = match &err {
            MangoDeskError::Llm(_) | MangoDeskError::Email(_) => err.to_string(),
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => {
                error!("Request failed: {}", err);
                INTERNAL_ERROR_MESSAGE.to_string()
            }
            _ => err.to_string(),
        };

        Self { status, message }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(format!("Invalid query: {}", rejection.body_text()))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::new(err.status(), err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = ErrorPayload {
            success: false,
            error: self.message,
        };
        (self.status, Json(payload)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
