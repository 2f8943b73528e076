//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (port window, timeouts > 0, capacity > 0)
//! - Check addresses and log filters parse before startup
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::GatewayConfig;
use crate::net::listener::{port_in_range, MAX_PORT, MIN_PORT};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.port {0} is outside [{min}, {max})", min = MIN_PORT, max = MAX_PORT)]
    PortOutOfRange(u32),

    #[error("listener.bind_ip {0:?} is not an IP address")]
    InvalidBindIp(String),

    #[error("listener.backlog must be positive, got {0}")]
    InvalidBacklog(i32),

    #[error("timeouts.idle_ms must be greater than zero")]
    ZeroIdleTimeout,

    #[error("poll.event_capacity must be greater than zero")]
    ZeroEventCapacity,

    #[error("sink.output_path must not be empty")]
    EmptyOutputPath,

    #[error("observability.log_level {0:?} is not a valid filter")]
    InvalidLogLevel(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check every semantic constraint, collecting all failures.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !port_in_range(config.listener.port) {
        errors.push(ValidationError::PortOutOfRange(config.listener.port));
    }
    if config.listener.bind_ip.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::InvalidBindIp(config.listener.bind_ip.clone()));
    }
    if config.listener.backlog <= 0 {
        errors.push(ValidationError::InvalidBacklog(config.listener.backlog));
    }
    if config.timeouts.idle_ms == 0 {
        errors.push(ValidationError::ZeroIdleTimeout);
    }
    if config.poll.event_capacity == 0 {
        errors.push(ValidationError::ZeroEventCapacity);
    }
    if config.sink.output_path.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyOutputPath);
    }
    if EnvFilter::try_new(&config.observability.log_level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn port_window_is_half_open() {
        let mut config = GatewayConfig::default();
        for (port, ok) in [(1023, false), (1024, true), (65535, true), (65536, false)] {
            config.listener.port = port;
            assert_eq!(validate_config(&config).is_ok(), ok, "port {port}");
        }
    }

    #[test]
    fn all_errors_are_reported() {
        let mut config = GatewayConfig::default();
        config.listener.port = 80;
        config.listener.bind_ip = "localhost".into();
        config.timeouts.idle_ms = 0;
        config.poll.event_capacity = 0;
        config.sink.output_path = PathBuf::new();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::PortOutOfRange(80),
                ValidationError::InvalidBindIp("localhost".into()),
                ValidationError::ZeroIdleTimeout,
                ValidationError::ZeroEventCapacity,
                ValidationError::EmptyOutputPath,
            ]
        );
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = GatewayConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::InvalidMetricsAddress("nowhere".into())])
        );
    }
}
