//! Sensor record subsystem.
//!
//! # Data Flow
//! ```text
//! socket bytes
//!     → codec.rs (RecordAssembler, 18-byte records)
//!     → SensorRecord
//!     → sink.rs (RecordSink: file or memory)
//! ```

pub mod codec;
pub mod sink;

pub use codec::{Field, RecordAssembler, SensorRecord, RECORD_LEN};
pub use sink::{FileSink, MemorySink, RecordSink, SinkError};
