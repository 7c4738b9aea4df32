//! Observability utilities for hostcall bridges.
//!
//! [`init_tracing`] installs the process-wide `tracing` subscriber and
//! [`DispatchStats`] counts dispatch outcomes when registered as a
//! [`DispatchObserver`](hostcall_kernel::DispatchObserver).

#![warn(missing_docs, clippy::pedantic)]

mod stats;

pub use stats::{DispatchSnapshot, DispatchStats};

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors raised while installing telemetry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TelemetryError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter `{filter}`: {reason}")]
    InvalidFilter {
        /// Directive that failed to parse.
        filter: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber was already installed.
    #[error("tracing subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

/// Convenience alias for telemetry results.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, or by `filter` when the
/// variable is unset.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for a malformed `filter` and
/// [`TelemetryError::AlreadyInstalled`] when another subscriber is active.
pub fn init_tracing(filter: &str) -> TelemetryResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => parse_filter(filter)?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .try_init()
        .map_err(|err| TelemetryError::AlreadyInstalled(err.to_string()))
}

fn parse_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|err| TelemetryError::InvalidFilter {
        filter: filter.to_owned(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_parse() {
        assert!(parse_filter("info,hostcall_kernel=debug").is_ok());
    }

    #[test]
    fn malformed_directive_is_reported() {
        let err = parse_filter("hostcall=loud").unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidFilter { .. }));
    }
}
