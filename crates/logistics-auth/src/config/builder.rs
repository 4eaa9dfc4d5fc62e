//! Configuration builder

use std::time::Duration;

use url::Url;

use crate::Error;
use crate::constants::{
    DEFAULT_AUTHENTICATED_HOME, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SILENT_CHECK_SSO_PATH,
    DEFAULT_TOKEN_REFRESH_THRESHOLD_SECS, DEFAULT_UNAUTHORIZED_PATH, TOKEN_REFRESH_INTERVAL,
};

/// Client configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: Url,
    pub app_origin: Url,
    pub identity_provider: IdentityProviderConfig,
    pub token_refresh_threshold_secs: i64,
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
    pub production: bool,
    pub unauthorized_path: String,
    pub authenticated_home: String,
    pub silent_check_sso_path: String,
    pub telemetry: TelemetryConfig,
}

impl Config {
    #[must_use]
    pub const fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Application origin without a trailing slash, e.g. `https://app.example.com`
    pub fn origin(&self) -> String {
        self.app_origin.origin().ascii_serialization()
    }

    pub fn silent_check_sso_redirect_uri(&self) -> String {
        format!("{}{}", self.origin(), self.silent_check_sso_path)
    }
}

/// Identity provider coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProviderConfig {
    pub url: Url,
    pub realm: String,
    pub client_id: String,
}

/// Telemetry configuration
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub json_logs: bool,
}

/// Configuration builder with fluent API
#[derive(Debug)]
pub struct ConfigBuilder {
    api_url: Option<Url>,
    app_origin: Option<Url>,
    identity_provider_url: Option<Url>,
    realm: Option<String>,
    client_id: Option<String>,
    token_refresh_threshold_secs: i64,
    refresh_interval: Duration,
    request_timeout: Duration,
    production: bool,
    unauthorized_path: Option<String>,
    authenticated_home: Option<String>,
    silent_check_sso_path: Option<String>,
    telemetry: TelemetryConfig,
}

impl ConfigBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            api_url: None,
            app_origin: None,
            identity_provider_url: None,
            realm: None,
            client_id: None,
            token_refresh_threshold_secs: DEFAULT_TOKEN_REFRESH_THRESHOLD_SECS,
            refresh_interval: TOKEN_REFRESH_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            production: false,
            unauthorized_path: None,
            authenticated_home: None,
            silent_check_sso_path: None,
            telemetry: TelemetryConfig {
                log_level: String::new(),
                json_logs: false,
            },
        }
    }

    #[must_use]
    pub fn api_url(mut self, url: Url) -> Self {
        self.api_url = Some(url);
        self
    }

    #[must_use]
    pub fn app_origin(mut self, url: Url) -> Self {
        self.app_origin = Some(url);
        self
    }

    #[must_use]
    pub fn identity_provider_url(mut self, url: Url) -> Self {
        self.identity_provider_url = Some(url);
        self
    }

    #[must_use]
    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    #[must_use]
    pub const fn token_refresh_threshold_secs(mut self, secs: i64) -> Self {
        self.token_refresh_threshold_secs = secs;
        self
    }

    #[must_use]
    pub const fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    #[must_use]
    pub fn unauthorized_path(mut self, path: impl Into<String>) -> Self {
        self.unauthorized_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn authenticated_home(mut self, path: impl Into<String>) -> Self {
        self.authenticated_home = Some(path.into());
        self
    }

    #[must_use]
    pub fn silent_check_sso_path(mut self, path: impl Into<String>) -> Self {
        self.silent_check_sso_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn log_level(mut self, level: String) -> Self {
        self.telemetry.log_level = level;
        self
    }

    #[must_use]
    pub const fn json_logs(mut self, enabled: bool) -> Self {
        self.telemetry.json_logs = enabled;
        self
    }

    pub fn build(self) -> crate::Result<Config> {
        let api_url = self
            .api_url
            .ok_or_else(|| Error::Config("api_url is required".into()))?;
        let url = self
            .identity_provider_url
            .ok_or_else(|| Error::Config("identity_provider.url is required".into()))?;
        let realm = self
            .realm
            .filter(|r| !r.is_empty())
            .ok_or_else(|| Error::Config("identity_provider.realm is required".into()))?;
        let client_id = self
            .client_id
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::Config("identity_provider.client_id is required".into()))?;

        if self.refresh_interval.is_zero() {
            return Err(Error::Config("refresh_interval must be non-zero".into()));
        }

        // Default the application origin to the API origin
        let app_origin = self.app_origin.unwrap_or_else(|| api_url.clone());

        let log_level = if self.telemetry.log_level.is_empty() {
            "info".to_string()
        } else {
            self.telemetry.log_level
        };

        Ok(Config {
            api_url,
            app_origin,
            identity_provider: IdentityProviderConfig {
                url,
                realm,
                client_id,
            },
            token_refresh_threshold_secs: self.token_refresh_threshold_secs,
            refresh_interval: self.refresh_interval,
            request_timeout: self.request_timeout,
            production: self.production,
            unauthorized_path: self
                .unauthorized_path
                .unwrap_or_else(|| DEFAULT_UNAUTHORIZED_PATH.to_string()),
            authenticated_home: self
                .authenticated_home
                .unwrap_or_else(|| DEFAULT_AUTHENTICATED_HOME.to_string()),
            silent_check_sso_path: self
                .silent_check_sso_path
                .unwrap_or_else(|| DEFAULT_SILENT_CHECK_SSO_PATH.to_string()),
            telemetry: TelemetryConfig {
                log_level,
                json_logs: self.telemetry.json_logs,
            },
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> ConfigBuilder {
        ConfigBuilder::new()
            .api_url(Url::parse("http://localhost:8081/").unwrap())
            .identity_provider_url(Url::parse("http://localhost:8080").unwrap())
            .realm("logistics")
            .client_id("logistics-frontend")
    }

    #[test]
    fn test_builder_defaults() {
        let builder = ConfigBuilder::new();
        assert_eq!(builder.token_refresh_threshold_secs, 60);
        assert_eq!(builder.refresh_interval, Duration::from_secs(30));
        assert!(!builder.production);
    }

    #[test]
    fn test_builder_requires_api_url() {
        let err = ConfigBuilder::new()
            .identity_provider_url(Url::parse("http://localhost:8080").unwrap())
            .realm("logistics")
            .client_id("logistics-frontend")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("api_url"));
    }

    #[test]
    fn test_builder_requires_identity_provider() {
        let result = ConfigBuilder::new()
            .api_url(Url::parse("http://localhost:8081").unwrap())
            .build();
        assert!(result.is_err());

        let result = minimal().realm("").build();
        assert!(result.unwrap_err().to_string().contains("realm"));
    }

    #[test]
    fn test_builder_applies_defaults() {
        let config = minimal().build().unwrap();
        assert_eq!(config.unauthorized_path, "/unauthorized");
        assert_eq!(config.authenticated_home, "/dashboard");
        assert_eq!(config.silent_check_sso_path, "/silent-check-sso.html");
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.origin(), "http://localhost:8081");
    }

    #[test]
    fn test_origin_and_silent_check_uri() {
        let config = minimal()
            .app_origin(Url::parse("https://app.logistics.example.com/shipments?x=1").unwrap())
            .build()
            .unwrap();
        assert_eq!(config.origin(), "https://app.logistics.example.com");
        assert_eq!(
            config.silent_check_sso_redirect_uri(),
            "https://app.logistics.example.com/silent-check-sso.html"
        );
    }

    #[test]
    fn test_zero_refresh_interval_rejected() {
        let err = minimal().refresh_interval(Duration::ZERO).build().unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_builder_overrides() {
        let config = minimal()
            .production(true)
            .token_refresh_threshold_secs(120)
            .unauthorized_path("/forbidden")
            .authenticated_home("/home")
            .log_level("debug".into())
            .json_logs(true)
            .build()
            .unwrap();
        assert!(config.production);
        assert_eq!(config.token_refresh_threshold_secs, 120);
        assert_eq!(config.unauthorized_path, "/forbidden");
        assert_eq!(config.authenticated_home, "/home");
        assert_eq!(config.telemetry.log_level, "debug");
        assert!(config.telemetry.json_logs);
    }
}
