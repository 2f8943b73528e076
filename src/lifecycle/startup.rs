//! Startup orchestration.
//!
//! # Responsibilities
//! - Load configuration from file, or fall back to defaults
//! - Layer command-line overrides on top
//! - Validate the merged result once more
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Overrides win over the file; the file wins over defaults

use std::path::{Path, PathBuf};

use crate::config::{load_config, validate_config, ConfigError, GatewayConfig};

/// Values supplied on the command line. `None` leaves the config untouched.
#[derive(Debug, Clone, Default)]
pub struct StartupOverrides {
    pub port: Option<u32>,
    pub bind_ip: Option<String>,
    pub output_path: Option<PathBuf>,
    pub idle_timeout_ms: Option<u64>,
    pub log_level: Option<String>,
    pub metrics_address: Option<String>,
}

impl StartupOverrides {
    /// Write every present override into `config`.
    pub fn apply(self, config: &mut GatewayConfig) {
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(ip) = self.bind_ip {
            config.listener.bind_ip = ip;
        }
        if let Some(path) = self.output_path {
            config.sink.output_path = path;
        }
        if let Some(ms) = self.idle_timeout_ms {
            config.timeouts.idle_ms = ms;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        if let Some(addr) = self.metrics_address {
            config.observability.metrics_enabled = true;
            config.observability.metrics_address = addr;
        }
    }
}

/// Build the effective configuration.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: StartupOverrides,
) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    overrides.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_file() {
        let config = resolve_config(None, StartupOverrides::default()).unwrap();
        assert_eq!(config.listener.port, GatewayConfig::default().listener.port);
    }

    #[test]
    fn overrides_beat_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[listener]\nport = 6000\n[timeouts]\nidle_ms = 900").unwrap();

        let overrides = StartupOverrides {
            port: Some(7000),
            ..StartupOverrides::default()
        };
        let config = resolve_config(Some(file.path()), overrides).unwrap();
        assert_eq!(config.listener.port, 7000);
        assert_eq!(config.timeouts.idle_ms, 900);
    }

    #[test]
    fn bad_override_is_rejected() {
        let overrides = StartupOverrides {
            port: Some(22),
            ..StartupOverrides::default()
        };
        assert!(matches!(
            resolve_config(None, overrides),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn metrics_address_enables_exporter() {
        let mut config = GatewayConfig::default();
        StartupOverrides {
            metrics_address: Some("127.0.0.1:9100".into()),
            ..StartupOverrides::default()
        }
        .apply(&mut config);
        assert!(config.observability.metrics_enabled);
        assert_eq!(config.observability.metrics_address, "127.0.0.1:9100");
    }
}
