//! Logging setup for scenario drivers.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is the driver's choice. [`init_logging`] wires up the usual one: an
//! `EnvFilter` honoring `RUST_LOG`, falling back to the given directive.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

/// Output format of the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line human-readable output.
    Pretty,
    /// One event per line.
    #[default]
    Compact,
    /// Newline-delimited JSON, for log shippers.
    Json,
}

/// Installs the global tracing subscriber. Fails if one is already set.
pub fn init_logging(format: LogFormat, default_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    };
    result.map_err(|e| Error::Internal(format!("failed to install subscriber: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_an_error() {
        init_logging(LogFormat::Compact, "warn").unwrap();
        assert!(init_logging(LogFormat::Json, "debug").is_err());
    }
}
