//! Store configuration.
//!
//! [`StoreConfig`] is the plain value the store is built from. [`StoreArgs`]
//! is its command-line/environment form, meant to be flattened into a host
//! binary's `clap` parser.

use std::time::Duration;

use clap::Args;

use crate::retry::{RetryPolicy, DEFAULT_RETRY_INTERVAL, DEFAULT_RETRY_TIMEOUT};

/// Tunables of an [`OperationStore`](crate::storage::OperationStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Pause between attempts of a retried call.
    pub retry_interval: Duration,
    /// Overall deadline of a retried call.
    pub retry_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retry_interval: DEFAULT_RETRY_INTERVAL,
            retry_timeout: DEFAULT_RETRY_TIMEOUT,
        }
    }
}

impl StoreConfig {
    /// The retry policy described by this configuration.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_interval, self.retry_timeout)
    }
}

/// Command-line and environment form of [`StoreConfig`].
#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    /// Pause between attempts of a retried storage call, in milliseconds.
    #[arg(long, env = "OPSTORE_RETRY_INTERVAL_MS", default_value_t = 1000)]
    pub retry_interval_ms: u64,

    /// Overall deadline of a retried storage call, in milliseconds.
    #[arg(long, env = "OPSTORE_RETRY_TIMEOUT_MS", default_value_t = 10_000)]
    pub retry_timeout_ms: u64,
}

impl From<StoreArgs> for StoreConfig {
    fn from(args: StoreArgs) -> Self {
        Self {
            retry_interval: Duration::from_millis(args.retry_interval_ms),
            retry_timeout: Duration::from_millis(args.retry_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(flatten)]
        store: StoreArgs,
    }

    #[test]
    fn defaults_match_store_defaults() {
        let cli = Cli::try_parse_from(["host"]).unwrap();
        assert_eq!(StoreConfig::from(cli.store), StoreConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "host",
            "--retry-interval-ms",
            "250",
            "--retry-timeout-ms",
            "3000",
        ])
        .unwrap();
        let config = StoreConfig::from(cli.store);
        assert_eq!(config.retry_interval, Duration::from_millis(250));
        assert_eq!(config.retry_timeout, Duration::from_secs(3));
        assert_eq!(
            config.retry_policy(),
            RetryPolicy::new(Duration::from_millis(250), Duration::from_secs(3))
        );
    }

    #[test]
    fn non_numeric_interval_is_rejected() {
        assert!(Cli::try_parse_from(["host", "--retry-interval-ms", "soon"]).is_err());
    }
}
