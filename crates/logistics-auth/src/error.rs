use thiserror::Error;

use crate::auth::{AuthError, IdentityProviderError};
use crate::pipeline::ApiError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Identity provider error: {0}")]
    IdentityProvider(#[from] IdentityProviderError),

    #[error("Identity client not initialized")]
    NotInitialized,

    #[error("Cannot create tenant-scoped resource: no tenant context available")]
    NoTenantContext,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl Error {
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    #[must_use]
    pub const fn is_not_initialized(&self) -> bool {
        matches!(self, Self::NotInitialized)
    }

    #[must_use]
    pub const fn is_no_tenant_context(&self) -> bool {
        matches!(self, Self::NoTenantContext)
    }

    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// HTTP status of a normalized API failure, if this is one
    #[must_use]
    pub const fn api_status(&self) -> Option<u16> {
        match self {
            Self::Api(err) => Some(err.status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
