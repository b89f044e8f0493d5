use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid period: {0}")]
    InvalidPeriod(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("query exceeded {0}s deadline")]
    QueryTimeout(u64),

    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidPeriod(_) | AppError::InvalidDate(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::QueryTimeout(_) => (StatusCode::GATEWAY_TIMEOUT, self.to_string()),
            AppError::SourceUnavailable(detail) => {
                tracing::error!("source unavailable: {}", detail);
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::Db(e) => {
                tracing::error!("database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database error".to_string())
            }
            AppError::Json(e) => {
                tracing::error!("JSON error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "serialization error".to_string())
            }
            AppError::Config(detail) => {
                tracing::error!("config error: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, "config error".to_string())
            }
            AppError::Other(e) => {
                tracing::error!("internal error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
