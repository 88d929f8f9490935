use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::chat::ChatError;
use crate::fetch::FetchError;
use crate::poll::QueryError;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    details: Value,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("upstream unavailable: {0}")]
    Upstream(String),
    #[error("{message}")]
    WithDetails {
        status: StatusCode,
        message: String,
        details: Value,
    },
}

/// A malformed hash or address can never match a record, so it answers
/// 404 like an unknown one, with the validation message as details.
fn not_found(message: String) -> ApiError {
    ApiError::WithDetails {
        status: StatusCode::NOT_FOUND,
        message: "not found".to_string(),
        details: Value::String(message),
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidHash(_) | FetchError::InvalidAddress(_) => not_found(err.to_string()),
            FetchError::Upstream(reason) => ApiError::Upstream(reason),
            FetchError::WrongChain { .. } => ApiError::Upstream(err.to_string()),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        if err.retryable {
            ApiError::Upstream(err.message)
        } else {
            not_found(err.message)
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Upstream { status, details } => ApiError::WithDetails {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                message: "chat completion API returned an error".to_string(),
                details,
            },
            ChatError::Transport(source) => ApiError::WithDetails {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "internal server error".to_string(),
                details: Value::String(source.to_string()),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, Value::Null),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, Value::Null),
            ApiError::Upstream(msg) => {
                tracing::warn!("upstream failure: {}", msg);
                (StatusCode::BAD_GATEWAY, "upstream unavailable".to_string(), Value::String(msg))
            }
            ApiError::WithDetails {
                status,
                message,
                details,
            } => (status, message, details),
        };
        (status, Json(ErrorBody { error, details })).into_response()
    }
}
