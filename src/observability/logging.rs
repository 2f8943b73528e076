//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Resolve the filter from `RUST_LOG`, else the configured level
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Human-readable `fmt` output on stderr

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `default_level`. Fails if a subscriber
/// is already installed.
pub fn init_logging(default_level: &str) -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_an_error() {
        // Either this call or an earlier test in the same process installed one.
        let _ = init_logging("debug");
        assert!(init_logging("debug").is_err());
    }
}
