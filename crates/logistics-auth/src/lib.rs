//! Authentication session and authorization for the logistics platform client
//!
//! The crate sits between an identity provider client and the platform API:
//!
//! - [`auth`] owns the session lifecycle, the user derived from token claims,
//!   and the tenant (agency) a session is scoped to
//! - [`guard`] decides whether navigation to a route may proceed
//! - [`pipeline`] decorates outbound API calls with the bearer token and the
//!   tenant header, and normalizes failures into [`ApiError`]
//! - [`transport`] performs the calls and offers a typed [`ApiClient`]
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use logistics_auth::auth::{AuthSessionController, ExecutionContext, StaticTokenClient};
//! use logistics_auth::pipeline::RequestPipeline;
//! use logistics_auth::transport::{ApiClient, ReqwestTransport};
//! use logistics_auth::{Config, RequestOptions};
//!
//! # async fn run(token: String) -> logistics_auth::Result<()> {
//! let config = Config::builder()
//!     .api_url("https://api.example.com".parse().unwrap())
//!     .identity_provider_url("https://sso.example.com".parse().unwrap())
//!     .realm("logistics")
//!     .client_id("logistics-frontend")
//!     .build()?;
//!
//! let client = Arc::new(StaticTokenClient::new(token)?);
//! let session = AuthSessionController::new(client, config.clone(), ExecutionContext::Interactive);
//! session.init().await;
//!
//! let transport = Arc::new(ReqwestTransport::new(config.request_timeout)?);
//! let pipeline = Arc::new(RequestPipeline::standard(&session, &config, transport));
//! let api = ApiClient::new(&config.api_url, pipeline);
//! let _shipments: serde_json::Value = api.get("/shipments", &RequestOptions::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
mod constants;
mod error;
pub mod guard;
pub mod observability;
pub mod pipeline;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use auth::{
    ActorType, ApiTenantContext, AuthError, AuthErrorCode, AuthSession, AuthSessionController,
    AuthenticatedUser, ExecutionContext, IdentityClient, TenantContextResolver,
};
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use guard::{Guard, GuardContext, GuardOutcome, GuardSet, RouteData, compose_guards};
pub use pipeline::{ApiError, RequestPipeline};
pub use transport::{ApiClient, PaginatedResponse, PaginationParams, RequestOptions};
