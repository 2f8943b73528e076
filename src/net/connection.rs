//! Connection state machine and lifecycle tracking.
//!
//! # Responsibilities
//! - Track connection state (Accepted → Active → Closed)
//! - Generate unique connection IDs that double as poll tokens
//! - Drain edge-triggered readiness into complete sensor records
//! - Deregister and close exactly once

use std::fmt;
use std::io::{self, Read};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

use mio::net::TcpStream;
use mio::{Interest, Registry, Token};

use crate::record::{RecordAssembler, SensorRecord};

/// First token handed to a client; lower values are reserved for the
/// listener and the shutdown waker.
pub const FIRST_CLIENT_TOKEN: usize = 2;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicUsize = AtomicUsize::new(FIRST_CLIENT_TOKEN);

const READ_CHUNK: usize = 4096;

/// Unique identifier for a connection, also its poll token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(usize);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The poll token for this connection.
    pub fn token(&self) -> Token {
        Token(self.0)
    }

    /// Get the raw ID value.
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Token> for ConnectionId {
    fn from(token: Token) -> Self {
        Self(token.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Connection state for lifecycle tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted but not yet registered with the multiplexer.
    Accepted,
    /// Registered and receiving records.
    Active,
    /// Deregistered and closed. Terminal.
    Closed,
}

/// Why a connection was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    PeerClosed,
    ReadError,
    IdleTimeout,
    Shutdown,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::PeerClosed => "peer_closed",
            CloseReason::ReadError => "read_error",
            CloseReason::IdleTimeout => "idle_timeout",
            CloseReason::Shutdown => "shutdown",
        }
    }
}

/// What a drain of the socket ended with.
#[derive(Debug)]
pub enum ReadOutcome {
    /// Everything available was read; the peer is still there.
    Drained,
    /// The peer closed its side (zero-length read).
    PeerClosed,
    /// The read failed with something other than would-block or interrupted.
    Failed(io::Error),
}

/// One accepted client.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    stream: TcpStream,
    peer: SocketAddr,
    assembler: RecordAssembler,
    state: ConnectionState,
}

impl Connection {
    pub fn new(id: ConnectionId, stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            id,
            stream,
            peer,
            assembler: RecordAssembler::new(),
            state: ConnectionState::Accepted,
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Bytes of an unfinished record held for this connection.
    pub fn pending_bytes(&self) -> usize {
        self.assembler.pending_len()
    }

    /// Register for edge-triggered read-readiness. Moves to `Active`.
    pub fn register(&mut self, registry: &Registry) -> io::Result<()> {
        registry.register(&mut self.stream, self.id.token(), Interest::READABLE)?;
        self.state = ConnectionState::Active;
        Ok(())
    }

    /// Read until the socket would block, pushing every complete record
    /// into `records`.
    ///
    /// Records completed before a peer close or error are still delivered;
    /// the trailing partial record is not.
    pub fn read_records(&mut self, records: &mut Vec<SensorRecord>) -> ReadOutcome {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => return ReadOutcome::PeerClosed,
                Ok(n) => {
                    self.assembler.push(&chunk[..n]);
                    while let Some(record) = self.assembler.next_record() {
                        records.push(record);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return ReadOutcome::Drained,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return ReadOutcome::Failed(e),
            }
        }
    }

    /// Deregister and close. Dropping the stream closes the socket.
    pub fn close(mut self, registry: &Registry) {
        if self.state == ConnectionState::Active {
            if let Err(e) = registry.deregister(&mut self.stream) {
                tracing::warn!(connection_id = %self.id, error = %e, "Deregister failed");
            }
        }
        if let Some(field) = self.assembler.pending_field() {
            tracing::debug!(
                connection_id = %self.id,
                pending = self.assembler.pending_len(),
                ?field,
                "Discarding partial record"
            );
        }
        self.state = ConnectionState::Closed;
        tracing::trace!(connection_id = %self.id, peer = %self.peer, "Connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
        assert!(id1.as_usize() >= FIRST_CLIENT_TOKEN);
    }

    #[test]
    fn connection_id_round_trips_through_token() {
        let id = ConnectionId::new();
        assert_eq!(ConnectionId::from(id.token()), id);
        assert_eq!(id.to_string(), format!("conn-{}", id.as_usize()));
    }

    /// Accept one client on a mio listener, returning both ends.
    fn pair() -> (Connection, std::net::TcpStream) {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let client = std::net::TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, peer) = listener.accept().unwrap();
        server.set_nonblocking(true).unwrap();
        let conn = Connection::new(ConnectionId::new(), TcpStream::from_std(server), peer);
        (conn, client)
    }

    fn drain_until(
        conn: &mut Connection,
        records: &mut Vec<SensorRecord>,
        done: impl Fn(&ReadOutcome, &[SensorRecord]) -> bool,
    ) -> ReadOutcome {
        for _ in 0..200 {
            let outcome = conn.read_records(records);
            if done(&outcome, records) {
                return outcome;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("connection never reached expected state");
    }

    #[test]
    fn reads_complete_records() {
        let (mut conn, mut client) = pair();
        let a = SensorRecord::new(1, 20.5, 100);
        let b = SensorRecord::new(2, -3.0, 200);
        client.write_all(&a.to_bytes()).unwrap();
        client.write_all(&b.to_bytes()).unwrap();

        let mut records = Vec::new();
        let outcome = drain_until(&mut conn, &mut records, |_, r| r.len() == 2);
        assert!(matches!(outcome, ReadOutcome::Drained));
        assert_eq!(records, vec![a, b]);
        assert_eq!(conn.pending_bytes(), 0);
    }

    #[test]
    fn partial_record_then_close_yields_nothing() {
        let (mut conn, mut client) = pair();
        client.write_all(&[0x01, 0x02]).unwrap();
        drop(client);

        let mut records = Vec::new();
        let outcome = drain_until(&mut conn, &mut records, |o, _| {
            matches!(o, ReadOutcome::PeerClosed)
        });
        assert!(matches!(outcome, ReadOutcome::PeerClosed));
        assert!(records.is_empty());
        assert_eq!(conn.pending_bytes(), 2);
    }

    #[test]
    fn record_split_across_writes_is_assembled() {
        let (mut conn, mut client) = pair();
        let record = SensorRecord::new(7, 1.25, -5);
        let bytes = record.to_bytes();
        client.write_all(&bytes[..5]).unwrap();

        let mut records = Vec::new();
        drain_until(&mut conn, &mut records, |_, _| true);
        client.write_all(&bytes[5..]).unwrap();
        drain_until(&mut conn, &mut records, |_, r| !r.is_empty());
        assert_eq!(records, vec![record]);
    }

    #[test]
    fn register_activates_connection() {
        let (mut conn, _client) = pair();
        let poll = mio::Poll::new().unwrap();
        assert_eq!(conn.state(), ConnectionState::Accepted);
        conn.register(poll.registry()).unwrap();
        assert_eq!(conn.state(), ConnectionState::Active);
        conn.close(poll.registry());
    }
}
