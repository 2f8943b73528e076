//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::net::listener::MAX_PENDING;

/// Root configuration for the sensor gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, port, backlog).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Readiness multiplexer settings.
    pub poll: PollConfig,

    /// Where decoded records go.
    pub sink: SinkConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// IP address to bind (e.g., "127.0.0.1").
    pub bind_ip: String,

    /// TCP port, accepted within [1024, 65536).
    pub port: u32,

    /// Pending-connection backlog passed to listen(2).
    pub backlog: i32,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_ip: "127.0.0.1".to_string(),
            port: 5678,
            backlog: MAX_PENDING,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Idle budget in milliseconds. A connection silent for this long is
    /// evicted, and a server with no connections for this long shuts down.
    pub idle_ms: u64,
}

impl TimeoutConfig {
    /// Idle budget as a `Duration`.
    pub fn idle(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { idle_ms: 5_000 }
    }
}

/// Readiness multiplexer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollConfig {
    /// Maximum readiness events returned per wake.
    pub event_capacity: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { event_capacity: 16 }
    }
}

/// Record sink configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SinkConfig {
    /// File receiving raw records.
    pub output_path: PathBuf,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("sensor_data_recv"),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let config = GatewayConfig::default();
        assert_eq!(config.listener.bind_ip, "127.0.0.1");
        assert_eq!(config.listener.backlog, 10);
        assert_eq!(config.timeouts.idle(), Duration::from_secs(5));
        assert_eq!(config.sink.output_path, PathBuf::from("sensor_data_recv"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [listener]
            port = 4000

            [timeouts]
            idle_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.port, 4000);
        assert_eq!(config.listener.bind_ip, "127.0.0.1");
        assert_eq!(config.timeouts.idle(), Duration::from_millis(250));
        assert_eq!(config.poll.event_capacity, 16);
    }
}
