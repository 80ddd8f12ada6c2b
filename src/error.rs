//! API Error Taxonomy
//! Mission: Map every failure onto one status code and one uniform JSON envelope

use crate::store::StoreError;
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

pub const INVALID_TOKEN_MESSAGE: &str = "Invalid or expired token";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";
const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing request fields (400)
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<String>,
    },
    /// Missing/invalid credentials or token (401)
    #[error("{0}")]
    Authentication(String),
    /// Authenticated but not allowed (403)
    #[error("{0}")]
    Authorization(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: Duration },
    /// Store, hashing or runtime failure; detail stays in the logs (500)
    #[error("internal error: {0:#}")]
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn invalid_field(field: &str, problem: &str) -> Self {
        ApiError::Validation {
            message: "Invalid request data".to_string(),
            details: Some(format!("{field} {problem}")),
        }
    }

    pub fn invalid_token() -> Self {
        ApiError::Authentication(INVALID_TOKEN_MESSAGE.to_string())
    }

    pub fn invalid_credentials() -> Self {
        ApiError::Authentication(INVALID_CREDENTIALS_MESSAGE.to_string())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Authorization(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        ApiError::Internal(err.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::Authorization(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { field } => {
                ApiError::Conflict(format!("{} already exists", capitalize(field)))
            }
            other => ApiError::Internal(other.into()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation {
            message: "Invalid request data".to_string(),
            details: Some(rejection.body_text()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation {
            message: "Invalid query parameters".to_string(),
            details: Some(rejection.body_text()),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation {
            message: "Invalid path parameters".to_string(),
            details: Some(rejection.body_text()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            ApiError::Internal(err) => {
                tracing::error!(error = %format!("{err:#}"), "Request failed with internal error");
                json!({ "success": false, "message": INTERNAL_MESSAGE })
            }
            ApiError::Validation {
                message,
                details: Some(details),
            } => json!({ "success": false, "message": message, "errors": details }),
            ApiError::RateLimited { retry_after } => json!({
                "success": false,
                "message": "Rate limit exceeded. Please try again later.",
                "retry_after_seconds": retry_after_secs(*retry_after),
            }),
            other => json!({ "success": false, "message": other.to_string() }),
        };

        let mut response = (status, Json(body)).into_response();
        if let ApiError::RateLimited { retry_after } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs(retry_after).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// Whole seconds, rounded up so clients never retry early.
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs();
    if retry_after.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs.max(1)
    }
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
