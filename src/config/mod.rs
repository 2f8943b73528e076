//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → CLI overrides applied in main.rs
//!     → handed to ConnectionManager::listen
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the loop starts
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    GatewayConfig, ListenerConfig, ObservabilityConfig, PollConfig, SinkConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
