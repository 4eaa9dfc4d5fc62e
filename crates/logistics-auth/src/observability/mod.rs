//! Logging setup

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::TelemetryConfig;
use crate::{Error, Result};

/// Build the log filter. `RUST_LOG` wins over the configured level.
fn build_filter(config: &TelemetryConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if config.log_level.is_empty() {
            "info"
        } else {
            config.log_level.as_str()
        };
        EnvFilter::new(level)
    })
}

/// Filter plus plain or JSON formatting, writing to `writer`
fn subscriber<W>(config: &TelemetryConfig, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let fmt_layer = if config.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(writer)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_ansi(false)
            .with_writer(writer)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(build_filter(config))
        .with(fmt_layer)
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean
/// for command output.
pub fn init_observability(config: &TelemetryConfig) -> Result<()> {
    subscriber(config, std::io::stderr)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {e}")))
}
