//! Fixed-width sensor record decoding.
//!
//! A record is three fields in host byte order with no framing:
//!
//! ```text
//! +--------+----------------+----------------+
//! | id u16 | value f64      | ts i64         |
//! +--------+----------------+----------------+
//!   2 bytes   8 bytes          8 bytes
//! ```

/// Size of the identifier field.
pub const ID_LEN: usize = std::mem::size_of::<u16>();
/// Size of the reading field.
pub const VALUE_LEN: usize = std::mem::size_of::<f64>();
/// Size of the timestamp field.
pub const TS_LEN: usize = std::mem::size_of::<i64>();
/// Size of a whole record on the wire and on disk.
pub const RECORD_LEN: usize = ID_LEN + VALUE_LEN + TS_LEN;

/// One reading forwarded by a sensor node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorRecord {
    /// Sensor identifier.
    pub id: u16,
    /// Measured value.
    pub value: f64,
    /// Measurement time, seconds since the epoch.
    pub ts: i64,
}

impl SensorRecord {
    pub const fn new(id: u16, value: f64, ts: i64) -> Self {
        Self { id, value, ts }
    }

    /// Encode in host byte order.
    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let mut out = [0u8; RECORD_LEN];
        out[..ID_LEN].copy_from_slice(&self.id.to_ne_bytes());
        out[ID_LEN..ID_LEN + VALUE_LEN].copy_from_slice(&self.value.to_ne_bytes());
        out[ID_LEN + VALUE_LEN..].copy_from_slice(&self.ts.to_ne_bytes());
        out
    }

    /// Decode from host byte order.
    pub fn from_bytes(bytes: &[u8; RECORD_LEN]) -> Self {
        let mut id = [0u8; ID_LEN];
        let mut value = [0u8; VALUE_LEN];
        let mut ts = [0u8; TS_LEN];
        id.copy_from_slice(&bytes[..ID_LEN]);
        value.copy_from_slice(&bytes[ID_LEN..ID_LEN + VALUE_LEN]);
        ts.copy_from_slice(&bytes[ID_LEN + VALUE_LEN..]);

        Self {
            id: u16::from_ne_bytes(id),
            value: f64::from_ne_bytes(value),
            ts: i64::from_ne_bytes(ts),
        }
    }
}

/// Field of a record that is still incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Sensor identifier.
    Id,
    /// Measured value.
    Value,
    /// Timestamp.
    Timestamp,
}

/// Collects bytes from a non-blocking stream into whole records.
///
/// Readiness is edge-triggered, so a read may end anywhere inside a record.
/// Leftover bytes wait here until the next readable event.
#[derive(Debug, Default)]
pub struct RecordAssembler {
    buf: Vec<u8>,
}

impl RecordAssembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(RECORD_LEN),
        }
    }

    /// Append freshly read bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Take the next complete record, if one is buffered.
    pub fn next_record(&mut self) -> Option<SensorRecord> {
        let bytes: [u8; RECORD_LEN] = self.buf.get(..RECORD_LEN)?.try_into().ok()?;
        self.buf.drain(..RECORD_LEN);
        Some(SensorRecord::from_bytes(&bytes))
    }

    /// Bytes of an unfinished record.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Field the next byte belongs to, when a record is partially received.
    pub fn pending_field(&self) -> Option<Field> {
        match self.buf.len() % RECORD_LEN {
            0 => None,
            n if n < ID_LEN => Some(Field::Id),
            n if n < ID_LEN + VALUE_LEN => Some(Field::Value),
            _ => Some(Field::Timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SensorRecord {
        SensorRecord {
            id: 15,
            value: 21.5,
            ts: 1_526_400_000,
        }
    }

    #[test]
    fn record_layout_is_id_value_ts() {
        let bytes = sample().to_bytes();
        assert_eq!(bytes.len(), 18);
        assert_eq!(&bytes[..2], &15u16.to_ne_bytes());
        assert_eq!(&bytes[2..10], &21.5f64.to_ne_bytes());
        assert_eq!(&bytes[10..], &1_526_400_000i64.to_ne_bytes());
    }

    #[test]
    fn assembler_waits_for_whole_record() {
        let bytes = sample().to_bytes();
        let mut assembler = RecordAssembler::new();

        assembler.push(&bytes[..2]);
        assert_eq!(assembler.next_record(), None);
        assert_eq!(assembler.pending_field(), Some(Field::Value));

        assembler.push(&bytes[2..12]);
        assert_eq!(assembler.pending_field(), Some(Field::Timestamp));
        assert_eq!(assembler.next_record(), None);

        assembler.push(&bytes[12..]);
        assert_eq!(assembler.next_record(), Some(sample()));
        assert_eq!(assembler.pending_len(), 0);
        assert_eq!(assembler.pending_field(), None);
    }

    #[test]
    fn assembler_splits_back_to_back_records() {
        let first = sample();
        let second = SensorRecord {
            id: 16,
            value: -3.25,
            ts: 7,
        };
        let mut assembler = RecordAssembler::new();
        assembler.push(&first.to_bytes());
        assembler.push(&second.to_bytes());
        assembler.push(&[0xAA]);

        assert_eq!(assembler.next_record(), Some(first));
        assert_eq!(assembler.next_record(), Some(second));
        assert_eq!(assembler.next_record(), None);
        assert_eq!(assembler.pending_len(), 1);
        assert_eq!(assembler.pending_field(), Some(Field::Id));
    }
}
