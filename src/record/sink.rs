//! Destinations for decoded records.
//!
//! # Responsibilities
//! - Accept one record per complete read
//! - Persist in the `sensor_data_recv` layout (FileSink)
//! - Keep records in memory for embedding and tests (MemorySink)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use crate::record::codec::SensorRecord;

/// Errors raised by a record sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The output file could not be created.
    #[error("failed to open output file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing or flushing a record failed.
    #[error("failed to write record: {0}")]
    Write(#[from] std::io::Error),
}

/// Receives every record the connection manager decodes.
pub trait RecordSink {
    /// Take ownership of one decoded record.
    fn accept(&mut self, record: SensorRecord) -> Result<(), SinkError>;

    /// Push buffered records to their destination.
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn accept(&mut self, record: SensorRecord) -> Result<(), SinkError> {
        (**self).accept(record)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        (**self).flush()
    }
}

/// Appends raw records to a file.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
}

impl FileSink {
    /// Create (or truncate) the output file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|source| SinkError::Open {
            path: path.clone(),
            source,
        })?;

        tracing::info!(path = %path.display(), "Record output file opened");

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    /// Path records are written to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records written so far.
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl RecordSink for FileSink {
    fn accept(&mut self, record: SensorRecord) -> Result<(), SinkError> {
        self.writer.write_all(&record.to_bytes())?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Shared in-memory record store. Clones see the same records.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<SensorRecord>>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record received so far.
    pub fn records(&self) -> Vec<SensorRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of records received.
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been received.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordSink for MemorySink {
    fn accept(&mut self, record: SensorRecord) -> Result<(), SinkError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::codec::RECORD_LEN;

    #[test]
    fn file_sink_writes_raw_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sensor_data_recv");
        let record = SensorRecord {
            id: 132,
            value: 18.75,
            ts: 1_700_000_000,
        };

        let mut sink = FileSink::create(&path).unwrap();
        sink.accept(record).unwrap();
        sink.accept(record).unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.written(), 2);

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 2 * RECORD_LEN);
        assert_eq!(&bytes[..RECORD_LEN], &record.to_bytes());
    }

    #[test]
    fn file_sink_reports_unopenable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out");
        let err = FileSink::create(&path).unwrap_err();
        assert!(matches!(err, SinkError::Open { .. }));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn memory_sink_clones_share_storage() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer
            .accept(SensorRecord {
                id: 1,
                value: 0.5,
                ts: 2,
            })
            .unwrap();

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].id, 1);
    }
}
