//! Uniform error shape for API failures

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::{Interceptor, Next, PipelineError};
use crate::transport::{ApiRequest, ApiResponse, HttpFailure};

/// Normalized API failure handed to callers
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message} (status {status})")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            url: url.into(),
            timestamp: Utc::now(),
        }
    }

    /// Normalize a wire failure. A `message` in the response body wins over
    /// the status table.
    pub fn from_failure(failure: &HttpFailure) -> Self {
        let message = failure
            .body
            .as_ref()
            .and_then(|body| body.get("message"))
            .and_then(serde_json::Value::as_str)
            .map_or_else(
                || message_for_status(failure.status).to_string(),
                ToString::to_string,
            );
        Self::new(failure.status, message, failure.url.clone())
    }
}

/// User-facing message for an HTTP status
pub const fn message_for_status(status: u16) -> &'static str {
    match status {
        0 => "Unable to connect to server. Please check your network connection.",
        400 => "Invalid request. Please check your input.",
        401 => "Authentication required. Please login.",
        403 => "Access denied. You do not have permission to perform this action.",
        404 => "The requested resource was not found.",
        409 => "Conflict. The resource may have been modified.",
        422 => "Validation error. Please check your input.",
        500 => "Internal server error. Please try again later.",
        502..=504 => "Service temporarily unavailable. Please try again later.",
        _ => "An unexpected error occurred.",
    }
}

/// Converts wire failures into [`ApiError`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorNormalizationInterceptor {
    log_errors: bool,
}

impl ErrorNormalizationInterceptor {
    #[must_use]
    pub const fn new(log_errors: bool) -> Self {
        Self { log_errors }
    }
}

#[async_trait]
impl Interceptor for ErrorNormalizationInterceptor {
    fn name(&self) -> &'static str {
        "error-normalization"
    }

    async fn intercept(
        &self,
        request: ApiRequest,
        next: Next<'_>,
    ) -> Result<ApiResponse, PipelineError> {
        next.run(request).await.map_err(|err| {
            let api_error = err.into_api_error();
            if self.log_errors {
                tracing::error!(
                    status = api_error.status,
                    url = %api_error.url,
                    message = %api_error.message,
                    "API error"
                );
            }
            PipelineError::Api(api_error)
        })
    }
}
