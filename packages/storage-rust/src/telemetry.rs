//! Tracing subscriber setup for binaries embedding the store.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is left to the host process.

use anyhow::Context;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directives, e.g. `info,opstore_storage=debug`.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Command-line and environment form of [`LogConfig`].
#[derive(Debug, Clone, clap::Args)]
pub struct LogArgs {
    /// Log filter directives.
    #[arg(long, env = "OPSTORE_LOG", default_value = "info")]
    pub log_filter: String,

    /// Log line format.
    #[arg(long, env = "OPSTORE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl From<LogArgs> for LogConfig {
    fn from(args: LogArgs) -> Self {
        Self {
            filter: args.log_filter,
            format: args.log_format,
        }
    }
}

/// Installs the global tracing subscriber.
///
/// # Errors
///
/// Fails if `config.filter` is not a valid filter, or if a global
/// subscriber is already installed.
pub fn init_tracing(config: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .with_context(|| format!("invalid log filter {:?}", config.filter))?;
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true).with_target(true))
            .try_init(),
    }
    .context("failed to install tracing subscriber")?;

    tracing::debug!(filter = %config.filter, format = ?config.format, "logging initialized");
    Ok(())
}
