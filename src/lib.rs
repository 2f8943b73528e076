//! Sensor gateway library.
//!
//! Accepts TCP connections from sensor nodes, decodes fixed-size readings
//! and forwards them to a sink, evicting clients that stay silent past an
//! idle budget.

pub mod collections;
pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod record;
pub mod server;
pub mod timer;

pub use collections::{Disposal, ElementOps, Insertion, NodeRef, OrderedList};
pub use config::schema::GatewayConfig;
pub use lifecycle::ShutdownHandle;
pub use record::{FileSink, MemorySink, RecordSink, SensorRecord};
pub use server::{ConnMgrError, ConnectionManager, ShutdownReason};
pub use timer::TimerQueue;
