//! Environment variable loading for configuration

use std::env;
use std::time::Duration;

use url::Url;

use super::builder::ConfigBuilder;
use crate::Result;

/// Environment variable names
mod vars {
    pub const API_URL: &str = "LOGISTICS_API_URL";
    pub const APP_ORIGIN: &str = "LOGISTICS_APP_ORIGIN";
    pub const IDP_URL: &str = "LOGISTICS_IDP_URL";
    pub const IDP_REALM: &str = "LOGISTICS_IDP_REALM";
    pub const IDP_CLIENT_ID: &str = "LOGISTICS_IDP_CLIENT_ID";
    pub const TOKEN_REFRESH_THRESHOLD_SECS: &str = "LOGISTICS_TOKEN_REFRESH_THRESHOLD_SECS";
    pub const REFRESH_INTERVAL_SECS: &str = "LOGISTICS_REFRESH_INTERVAL_SECS";
    pub const REQUEST_TIMEOUT_SECS: &str = "LOGISTICS_REQUEST_TIMEOUT_SECS";
    pub const PRODUCTION: &str = "LOGISTICS_PRODUCTION";
    pub const RUST_LOG: &str = "RUST_LOG";
    pub const JSON_LOGS: &str = "LOGISTICS_JSON_LOGS";
}

fn parse_url(var: &str, value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| crate::Error::Config(format!("Invalid {var}: {e}")))
}

/// Load configuration from environment variables
pub fn load_from_env(mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
    if let Ok(value) = env::var(vars::API_URL) {
        builder = builder.api_url(parse_url(vars::API_URL, &value)?);
    }

    if let Ok(value) = env::var(vars::APP_ORIGIN) {
        builder = builder.app_origin(parse_url(vars::APP_ORIGIN, &value)?);
    }

    // Identity provider
    if let Ok(value) = env::var(vars::IDP_URL) {
        builder = builder.identity_provider_url(parse_url(vars::IDP_URL, &value)?);
    }

    if let Ok(realm) = env::var(vars::IDP_REALM) {
        builder = builder.realm(realm);
    }

    if let Ok(client_id) = env::var(vars::IDP_CLIENT_ID) {
        builder = builder.client_id(client_id);
    }

    // Session timing
    if let Ok(secs_str) = env::var(vars::TOKEN_REFRESH_THRESHOLD_SECS)
        && let Ok(secs) = secs_str.parse::<i64>()
    {
        builder = builder.token_refresh_threshold_secs(secs);
    }

    if let Ok(secs_str) = env::var(vars::REFRESH_INTERVAL_SECS)
        && let Ok(secs) = secs_str.parse::<u64>()
    {
        builder = builder.refresh_interval(Duration::from_secs(secs));
    }

    if let Ok(secs_str) = env::var(vars::REQUEST_TIMEOUT_SECS)
        && let Ok(secs) = secs_str.parse::<u64>()
    {
        builder = builder.request_timeout(Duration::from_secs(secs));
    }

    if let Ok(val) = env::var(vars::PRODUCTION) {
        builder = builder.production(parse_bool(&val));
    }

    // Telemetry
    if let Ok(level) = env::var(vars::RUST_LOG) {
        builder = builder.log_level(level);
    }

    if let Ok(val) = env::var(vars::JSON_LOGS) {
        builder = builder.json_logs(parse_bool(&val));
    }

    Ok(builder)
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
