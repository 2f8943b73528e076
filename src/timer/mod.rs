//! Idle-deadline tracking.
//!
//! # Data Flow
//! ```text
//! accept     → TimerQueue::schedule (tail append)
//! readable   → TimerQueue::refresh (in place)
//! close      → TimerQueue::cancel
//! every wake → TimerQueue::evict_expired (full scan)
//! poll wait  ← TimerQueue::next_deadline (head only)
//! ```

pub mod queue;

pub use queue::{DeadlineOps, TimerEntry, TimerQueue};
