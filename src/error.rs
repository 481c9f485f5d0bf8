use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::generator::GenerationError;

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const GENERATION_FAILED: &str = "generation_failed";
    pub const PROVIDER_BUSY: &str = "provider_busy";
    pub const NOT_CONFIGURED: &str = "not_configured";
    pub const INTERNAL: &str = "internal_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("rate limit exceeded")]
    RateLimited { retry_after: Duration },
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, codes::BAD_REQUEST),
            Self::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, codes::RATE_LIMITED),
            Self::Generation(GenerationError::RateLimited) => {
                (StatusCode::SERVICE_UNAVAILABLE, codes::PROVIDER_BUSY)
            }
            Self::Generation(GenerationError::MissingApiKey) => {
                (StatusCode::SERVICE_UNAVAILABLE, codes::NOT_CONFIGURED)
            }
            Self::Generation(GenerationError::Aborted(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, codes::INTERNAL)
            }
            Self::Generation(_) => (StatusCode::BAD_GATEWAY, codes::GENERATION_FAILED),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, codes::INTERNAL),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code,
                message: self.to_string(),
            },
        };
        let mut response = (status, Json(body)).into_response();

        if let Self::RateLimited { retry_after } = self {
            // Round up so clients never retry inside the window
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
