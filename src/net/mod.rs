//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (port check, socket/bind/listen, accept)
//!     → connection.rs (registration, record reads, close)
//!     → Hand off to the event loop
//!
//! Connection States:
//!     Accepted → Active → Closed
//! ```
//!
//! # Design Decisions
//! - Port window is checked before any socket exists
//! - Setup stages fail separately so the caller knows which one broke
//! - Reads are edge-triggered and drain until would-block

pub mod connection;
pub mod listener;

pub use connection::{CloseReason, Connection, ConnectionId, ConnectionState, ReadOutcome};
pub use listener::{port_in_range, validate_port, Listener, MAX_PENDING, MAX_PORT, MIN_PORT};
