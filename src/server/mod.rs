//! Connection manager subsystem.
//!
//! # Data Flow
//! ```text
//! ConnectionManager::listen(config)
//!     → Listener bound, registered with the multiplexer
//!     → run(sink):
//!         wait (timer head or idle budget)
//!         → accept / refresh + read / forward records
//!         → evict expired deadlines
//!     → ShutdownReason (IdleTimeout | Requested)
//! ```

pub mod error;
pub mod event_loop;

pub use error::{ConnMgrError, SetupStage};
pub use event_loop::{ConnectionManager, LoopState, ShutdownReason, LISTENER_TOKEN, WAKER_TOKEN};
