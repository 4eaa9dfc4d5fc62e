//! Authentication error types

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of a session-level authentication failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthErrorCode {
    InitializationFailed,
    LoginFailed,
    TokenExpired,
    TokenRefreshFailed,
    Unauthorized,
    NetworkError,
}

impl AuthErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InitializationFailed => "INITIALIZATION_FAILED",
            Self::LoginFailed => "LOGIN_FAILED",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenRefreshFailed => "TOKEN_REFRESH_FAILED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NetworkError => "NETWORK_ERROR",
        }
    }
}

impl fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error recorded on the session or raised by a failed login
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{code}: {message}")]
pub struct AuthError {
    pub code: AuthErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AuthError {
    pub fn new(code: AuthErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<serde_json::Value>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn initialization_failed(details: impl Into<serde_json::Value>) -> Self {
        Self::new(
            AuthErrorCode::InitializationFailed,
            "Failed to initialize identity client",
        )
        .with_details(details)
    }

    pub fn login_failed(details: impl Into<serde_json::Value>) -> Self {
        Self::new(AuthErrorCode::LoginFailed, "Login failed").with_details(details)
    }

    pub fn refresh_failed() -> Self {
        Self::new(
            AuthErrorCode::TokenRefreshFailed,
            "Token refresh failed. Please login again.",
        )
    }
}

/// Failure reported by an identity provider client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityProviderError {
    #[error("identity provider unreachable: {0}")]
    Unreachable(String),

    #[error("identity provider rejected the request: {0}")]
    Rejected(String),

    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("redirect failed: {0}")]
    Redirect(String),
}
