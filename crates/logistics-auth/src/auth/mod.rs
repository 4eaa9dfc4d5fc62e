//! Authentication session and tenant context
//!
//! # Components
//!
//! - [`AuthSessionController`] owns the session lifecycle on top of an
//!   [`IdentityClient`] and publishes [`AuthSession`] snapshots
//! - [`AuthenticatedUser::from_claims`] maps token claims to the session user
//! - [`TenantContextResolver`] derives the agency a session is scoped to
//!
//! Token material stays inside the identity client. The controller reads it on
//! demand and never logs it.

mod claims;
mod controller;
mod error;
mod provider;
mod refresh;
mod session;
mod tenant;

pub use claims::{ActorType, AuthenticatedUser, JwtClaims};
pub use controller::{AuthSessionController, ExecutionContext};
pub use error::{AuthError, AuthErrorCode, IdentityProviderError};
pub use provider::{
    EventSender, IdentityClient, IdentityEvent, InitOptions, OnLoad, PkceMethod,
    StaticTokenClient,
};
pub use refresh::{RefreshHandle, TokenRefreshTask};
pub use session::{AuthSession, SessionPhase, SessionStore};
pub use tenant::{ApiTenantContext, TenantContextResolver};
