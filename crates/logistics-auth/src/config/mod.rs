//! Configuration management
//!
//! Supports configuration loading with precedence: env > file > CLI > defaults

mod builder;
mod env;
mod file;

pub use builder::{Config, ConfigBuilder, IdentityProviderConfig, TelemetryConfig};

use crate::Result;

/// Load configuration with precedence: env > file > `base`
pub fn load_config(base: ConfigBuilder) -> Result<ConfigBuilder> {
    let mut builder = base;

    if let Some(path) = file::find_config_file() {
        tracing::info!("Loading configuration from {}", path.display());
        builder = file::load_from_file(&path, builder)?;
    }

    env::load_from_env(builder)
}

/// Load configuration from a specific file path
pub fn load_config_from_path(path: &std::path::Path, base: ConfigBuilder) -> Result<ConfigBuilder> {
    let builder = file::load_from_file(path, base)?;
    env::load_from_env(builder)
}
