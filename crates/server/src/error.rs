use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal Server Error: {0}")]
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Io(_) | ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let error_message = match &self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => msg.clone(),
            ApiError::Io(e) => {
                tracing::error!("API IO error: {}", e);
                "Internal server error".to_string()
            }
            ApiError::InternalError(msg) => {
                tracing::error!("API internal error: {}", msg);
                "Internal server error".to_string()
            }
        };

        let body = json!({ "success": false, "error": error_message });
        (status_code, Json(body)).into_response()
    }
}
