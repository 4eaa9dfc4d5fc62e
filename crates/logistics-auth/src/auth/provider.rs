//! Identity provider client seam

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::claims::JwtClaims;
use super::error::IdentityProviderError;
use crate::Result;
use crate::config::{Config, IdentityProviderConfig};

/// How the identity client treats a missing session on load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnLoad {
    #[default]
    CheckSso,
    LoginRequired,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PkceMethod {
    #[default]
    S256,
}

/// Options for the identity client handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOptions {
    pub on_load: OnLoad,
    pub check_login_iframe: bool,
    pub pkce_method: PkceMethod,
    pub silent_check_sso_redirect_uri: Option<String>,
    pub enable_logging: bool,
}

impl InitOptions {
    /// Defaults derived from the application configuration
    pub fn for_config(config: &Config) -> Self {
        Self {
            on_load: OnLoad::CheckSso,
            check_login_iframe: false,
            pkce_method: PkceMethod::S256,
            silent_check_sso_redirect_uri: Some(config.silent_check_sso_redirect_uri()),
            enable_logging: !config.production,
        }
    }

    #[must_use]
    pub const fn on_load(mut self, on_load: OnLoad) -> Self {
        self.on_load = on_load;
        self
    }

    #[must_use]
    pub const fn check_login_iframe(mut self, enabled: bool) -> Self {
        self.check_login_iframe = enabled;
        self
    }

    #[must_use]
    pub const fn enable_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }
}

/// Lifecycle notification emitted by an identity client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    AuthSuccess,
    AuthError(String),
    AuthRefreshSuccess,
    AuthRefreshError,
    TokenExpired,
    AuthLogout,
}

pub type EventSender = mpsc::UnboundedSender<IdentityEvent>;

/// Client of the external identity provider.
///
/// Implementations own the token material. The session controller only reads
/// tokens through this trait and never stores them itself.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Perform the handshake, returning whether a session exists.
    /// Lifecycle events are delivered on `events` for the client's lifetime.
    async fn init(
        &self,
        provider: &IdentityProviderConfig,
        options: &InitOptions,
        events: EventSender,
    ) -> std::result::Result<bool, IdentityProviderError>;

    async fn login(&self, redirect_uri: &str) -> std::result::Result<(), IdentityProviderError>;

    async fn logout(&self, redirect_uri: &str) -> std::result::Result<(), IdentityProviderError>;

    /// Refresh the token if it expires within `min_validity_secs`.
    /// A negative value forces a refresh. Returns whether a refresh happened.
    async fn update_token(
        &self,
        min_validity_secs: i64,
    ) -> std::result::Result<bool, IdentityProviderError>;

    fn authenticated(&self) -> bool;

    fn token(&self) -> Option<String>;

    fn refresh_token(&self) -> Option<String>;

    fn token_parsed(&self) -> Option<JwtClaims>;
}

/// Identity client backed by a pre-issued access token.
///
/// Used by headless tools that receive a token out of band. The token cannot
/// be refreshed, so a forced refresh always fails.
#[derive(Debug)]
pub struct StaticTokenClient {
    token: String,
    claims: JwtClaims,
    authenticated: AtomicBool,
    redirects: Mutex<Vec<String>>,
}

impl StaticTokenClient {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let claims = JwtClaims::decode_unverified(&token)?;
        Ok(Self {
            token,
            claims,
            authenticated: AtomicBool::new(false),
            redirects: Mutex::new(Vec::new()),
        })
    }

    pub fn claims(&self) -> &JwtClaims {
        &self.claims
    }

    /// Redirect targets requested through login and logout
    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().clone()
    }

    fn seconds_remaining(&self) -> i64 {
        self.claims.exp - Utc::now().timestamp()
    }
}

#[async_trait]
impl IdentityClient for StaticTokenClient {
    async fn init(
        &self,
        provider: &IdentityProviderConfig,
        _options: &InitOptions,
        _events: EventSender,
    ) -> std::result::Result<bool, IdentityProviderError> {
        let valid = self.seconds_remaining() > 0;
        if !valid {
            tracing::warn!(sub = %self.claims.sub, "Static token already expired");
        }
        if let Some(iss) = &self.claims.iss
            && !iss.starts_with(provider.url.as_str().trim_end_matches('/'))
        {
            tracing::debug!(iss = %iss, provider = %provider.url, "Token issued by another provider");
        }
        self.authenticated.store(valid, Ordering::Release);
        Ok(valid)
    }

    async fn login(&self, redirect_uri: &str) -> std::result::Result<(), IdentityProviderError> {
        self.redirects.lock().push(redirect_uri.to_string());
        Ok(())
    }

    async fn logout(&self, redirect_uri: &str) -> std::result::Result<(), IdentityProviderError> {
        self.authenticated.store(false, Ordering::Release);
        self.redirects.lock().push(redirect_uri.to_string());
        Ok(())
    }

    async fn update_token(
        &self,
        min_validity_secs: i64,
    ) -> std::result::Result<bool, IdentityProviderError> {
        if !self.authenticated() {
            return Err(IdentityProviderError::RefreshFailed(
                "no active session".to_string(),
            ));
        }
        if min_validity_secs < 0 || self.seconds_remaining() < min_validity_secs {
            return Err(IdentityProviderError::RefreshFailed(
                "static token cannot be refreshed".to_string(),
            ));
        }
        Ok(false)
    }

    fn authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    fn token(&self) -> Option<String> {
        self.authenticated().then(|| self.token.clone())
    }

    fn refresh_token(&self) -> Option<String> {
        None
    }

    fn token_parsed(&self) -> Option<JwtClaims> {
        self.authenticated().then(|| self.claims.clone())
    }
}
