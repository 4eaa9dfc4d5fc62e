//! TOML configuration file loading

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use super::builder::ConfigBuilder;
use crate::Result;

/// Configuration file locations checked in order
const CONFIG_PATHS: &[&str] = &[
    "./logistics-auth.toml",
    "~/.config/logistics-auth/config.toml",
    "/etc/logistics-auth/config.toml",
];

/// Find the first existing configuration file
pub fn find_config_file() -> Option<PathBuf> {
    for path_str in CONFIG_PATHS {
        let path = if path_str.starts_with('~') {
            if let Ok(home) = std::env::var("HOME") {
                PathBuf::from(path_str.replacen('~', &home, 1))
            } else {
                continue;
            }
        } else {
            PathBuf::from(path_str)
        };

        if path.exists() {
            return Some(path);
        }
    }
    None
}

/// Load configuration from a TOML file
pub fn load_from_file(path: &Path, builder: ConfigBuilder) -> Result<ConfigBuilder> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let file_config: FileConfig = toml::from_str(&content).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to parse config file {}: {}",
            path.display(),
            e
        ))
    })?;

    apply_file_config(builder, file_config)
}

fn parse_url(field: &str, value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| crate::Error::Config(format!("Invalid {field}: {e}")))
}

fn apply_file_config(mut builder: ConfigBuilder, config: FileConfig) -> Result<ConfigBuilder> {
    if let Some(production) = config.production {
        builder = builder.production(production);
    }

    if let Some(api) = config.api {
        if let Some(url) = api.url {
            builder = builder.api_url(parse_url("api.url", &url)?);
        }

        if let Some(timeout) = api.timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(timeout));
        }
    }

    if let Some(app) = config.app {
        if let Some(origin) = app.origin {
            builder = builder.app_origin(parse_url("app.origin", &origin)?);
        }

        if let Some(path) = app.unauthorized_path {
            builder = builder.unauthorized_path(path);
        }

        if let Some(path) = app.authenticated_home {
            builder = builder.authenticated_home(path);
        }

        if let Some(path) = app.silent_check_sso_path {
            builder = builder.silent_check_sso_path(path);
        }
    }

    if let Some(idp) = config.identity_provider {
        if let Some(url) = idp.url {
            builder = builder.identity_provider_url(parse_url("identity_provider.url", &url)?);
        }

        if let Some(realm) = idp.realm {
            builder = builder.realm(realm);
        }

        if let Some(client_id) = idp.client_id {
            builder = builder.client_id(client_id);
        }
    }

    if let Some(session) = config.session {
        if let Some(secs) = session.token_refresh_threshold_secs {
            builder = builder.token_refresh_threshold_secs(secs);
        }

        if let Some(secs) = session.refresh_interval_secs {
            builder = builder.refresh_interval(Duration::from_secs(secs));
        }
    }

    if let Some(obs) = config.observability {
        if let Some(level) = obs.log_level {
            builder = builder.log_level(level);
        }

        if let Some(json) = obs.json_logs {
            builder = builder.json_logs(json);
        }
    }

    Ok(builder)
}

/// Root configuration file structure
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    production: Option<bool>,
    api: Option<ApiFileConfig>,
    app: Option<AppFileConfig>,
    identity_provider: Option<IdentityProviderFileConfig>,
    session: Option<SessionFileConfig>,
    observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Deserialize)]
struct ApiFileConfig {
    url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct AppFileConfig {
    origin: Option<String>,
    unauthorized_path: Option<String>,
    authenticated_home: Option<String>,
    silent_check_sso_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdentityProviderFileConfig {
    url: Option<String>,
    realm: Option<String>,
    client_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionFileConfig {
    token_refresh_threshold_secs: Option<i64>,
    refresh_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ObservabilityConfig {
    log_level: Option<String>,
    json_logs: Option<bool>,
}
