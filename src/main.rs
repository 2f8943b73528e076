//! Sensor gateway
//!
//! Listens for sensor nodes, writes every reading they send to a file and
//! exits once nobody has connected for a whole idle budget.
//!
//! # Architecture Overview
//!
//! ```text
//!     sensor node ──TCP──▶ net::Listener ──▶ server::ConnectionManager ──▶ record::FileSink
//!                                               │            ▲
//!                                               ▼            │
//!                                          timer::TimerQueue (idle deadlines)
//! ```
//!
//! # Exit Status
//! - 0: shutdown requested
//! - 1: no connections within the idle budget
//! - 2: configuration or setup failure

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use sensor_gateway::lifecycle::{resolve_config, StartupOverrides};
use sensor_gateway::observability::{init_logging, init_metrics};
use sensor_gateway::{ConnectionManager, FileSink, ShutdownReason};

const EXIT_IDLE_TIMEOUT: u8 = 1;
const EXIT_SETUP_FAILURE: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "sensor-gateway", version)]
#[command(about = "Collects sensor readings over TCP", long_about = None)]
struct Args {
    /// Port to listen on, within [1024, 65536)
    port: Option<u32>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// IP address to bind
    #[arg(long)]
    bind: Option<String>,

    /// File receiving raw records
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Idle budget in milliseconds
    #[arg(long)]
    idle_timeout_ms: Option<u64>,

    /// Log level or filter directive
    #[arg(long)]
    log_level: Option<String>,

    /// Serve Prometheus metrics on this address
    #[arg(long)]
    metrics_address: Option<String>,
}

impl Args {
    fn overrides(&self) -> StartupOverrides {
        StartupOverrides {
            port: self.port,
            bind_ip: self.bind.clone(),
            output_path: self.output.clone(),
            idle_timeout_ms: self.idle_timeout_ms,
            log_level: self.log_level.clone(),
            metrics_address: self.metrics_address.clone(),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match resolve_config(args.config.as_deref(), args.overrides()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("sensor-gateway: {e}");
            return ExitCode::from(EXIT_SETUP_FAILURE);
        }
    };

    if let Err(e) = init_logging(&config.observability.log_level) {
        eprintln!("sensor-gateway: logging unavailable: {e}");
    }

    tracing::info!("sensor-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_ip = %config.listener.bind_ip,
        port = config.listener.port,
        idle_ms = config.timeouts.idle_ms,
        output = %config.sink.output_path.display(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut sink = match FileSink::create(&config.sink.output_path) {
        Ok(sink) => sink,
        Err(e) => {
            tracing::error!(error = %e, "Cannot open output");
            return ExitCode::from(EXIT_SETUP_FAILURE);
        }
    };

    let mut manager = match ConnectionManager::listen(&config) {
        Ok(manager) => manager,
        Err(e) => {
            tracing::error!(error = %e, "Listener setup failed");
            return ExitCode::from(EXIT_SETUP_FAILURE);
        }
    };

    match manager.run(&mut sink) {
        Ok(ShutdownReason::IdleTimeout) => {
            tracing::info!(records = sink.written(), "Idle timeout, exiting");
            ExitCode::from(EXIT_IDLE_TIMEOUT)
        }
        Ok(ShutdownReason::Requested) => {
            tracing::info!(records = sink.written(), "Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Event loop failed");
            ExitCode::from(EXIT_SETUP_FAILURE)
        }
    }
}
