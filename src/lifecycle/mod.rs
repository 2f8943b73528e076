//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Apply CLI overrides → Validate → hand to ConnectionManager
//!
//! Shutdown (shutdown.rs):
//!     trigger() → Wake poll → Release queue & connections → Close listener → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then logging and metrics, then the listener
//! - Shutdown is requested from any thread but performed on the loop thread

pub mod shutdown;
pub mod startup;

pub use shutdown::ShutdownHandle;
pub use startup::{resolve_config, StartupOverrides};
