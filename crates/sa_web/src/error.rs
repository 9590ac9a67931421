use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sa_core::PipelineError;
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    /// 400
    BadRequest(String),
    /// 500
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

// the stage is already in the stats row; clients get the original message
impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Internal(err.message())
    }
}
