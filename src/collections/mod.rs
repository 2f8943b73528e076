//! Container subsystem.
//!
//! # Data Flow
//! ```text
//! caller element
//!     → Insertion::{Owned, Copied} (ops.rs decides who owns what)
//!     → OrderedList node (dplist.rs, arena slot + NodeRef)
//!     → Disposal::{Free, Keep} on removal
//! ```
//!
//! # Design Decisions
//! - One set of element operations per list instance, fixed at creation
//! - Position and reference addressing share the same clamping rules
//! - Node references are generation-checked, never raw pointers

pub mod dplist;
pub mod ops;

pub use dplist::{Iter, NodeRef, OrderedList};
pub use ops::{Disposal, ElementOps, FnOps, Insertion, NaturalOps};
