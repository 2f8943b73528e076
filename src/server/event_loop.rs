//! Readiness-driven connection manager.
//!
//! # Responsibilities
//! - Own the listener, the multiplexer and every client connection
//! - Compute each wait from the timer queue head, or the idle budget when empty
//! - Accept, refresh, read and forward records on readiness
//! - Evict idle connections after readiness handling in the same wake
//! - Shut down on global idle timeout or on request
//!
//! # Design Decisions
//! - Single thread; the only blocking call is `Poll::poll`
//! - Connection IDs are poll tokens, so readiness maps straight to a connection
//! - Peer close and read errors cancel the timer entry, so the queue only
//!   holds live connections

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use mio::net::TcpStream;
use mio::{Events, Poll, Token};

use crate::config::GatewayConfig;
use crate::lifecycle::ShutdownHandle;
use crate::net::{CloseReason, Connection, ConnectionId, Listener, ReadOutcome};
use crate::observability::metrics;
use crate::record::{RecordSink, SensorRecord};
use crate::server::error::{ConnMgrError, SetupStage};
use crate::timer::TimerQueue;

/// Poll token of the listening socket.
pub const LISTENER_TOKEN: Token = Token(0);
/// Poll token of the shutdown waker.
pub const WAKER_TOKEN: Token = Token(1);

/// Where the event loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Handling readiness or about to compute the next wait.
    Listening,
    /// Blocked in the multiplexer.
    WaitingForReady,
    /// Releasing connections and the timer queue.
    ShuttingDown,
    /// Everything released, listener closed.
    Terminated,
}

/// Why `run` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// No connections existed and nothing happened for a whole idle budget.
    IdleTimeout,
    /// A [`ShutdownHandle`] was triggered.
    Requested,
}

/// Accepts sensor clients and forwards their records to a sink.
#[derive(Debug)]
pub struct ConnectionManager {
    poll: Poll,
    events: Option<Events>,
    timers: Option<TimerQueue<ConnectionId>>,
    connections: HashMap<ConnectionId, Connection>,
    listener: Option<Listener>,
    shutdown: ShutdownHandle,
    idle: Duration,
    state: LoopState,
}

impl ConnectionManager {
    /// Bind the listener and set up the multiplexer.
    ///
    /// Fails with [`ConnMgrError::Address`] before creating anything when the
    /// port is out of range.
    pub fn listen(config: &GatewayConfig) -> Result<Self, ConnMgrError> {
        let mut listener = Listener::bind(&config.listener)?;
        let poll = Poll::new().map_err(SetupStage::PollCreate.wrap())?;
        listener.register(poll.registry(), LISTENER_TOKEN)?;
        let shutdown = ShutdownHandle::new(poll.registry(), WAKER_TOKEN)
            .map_err(SetupStage::Register.wrap())?;

        tracing::info!(
            address = %listener.local_addr(),
            idle_ms = config.timeouts.idle_ms,
            event_capacity = config.poll.event_capacity,
            "Connection manager listening"
        );

        Ok(Self {
            poll,
            events: Some(Events::with_capacity(config.poll.event_capacity)),
            timers: Some(TimerQueue::new()),
            connections: HashMap::new(),
            listener: Some(listener),
            shutdown,
            idle: config.timeouts.idle(),
            state: LoopState::Listening,
        })
    }

    /// Drive the loop until idle timeout or a shutdown request.
    ///
    /// On return every connection is closed, the timer queue released and
    /// the listener closed. Calling again afterwards yields
    /// [`ConnMgrError::Terminated`].
    pub fn run<S>(&mut self, sink: &mut S) -> Result<ShutdownReason, ConnMgrError>
    where
        S: RecordSink + ?Sized,
    {
        if self.timers.is_none() || self.events.is_none() {
            return Err(ConnMgrError::Terminated);
        }

        loop {
            if let Some(reason) = self.turn(sink)? {
                return Ok(reason);
            }
        }
    }

    /// One wake: wait, handle every reported event, then evict.
    ///
    /// Returns the shutdown reason once the loop has finished.
    fn turn<S>(&mut self, sink: &mut S) -> Result<Option<ShutdownReason>, ConnMgrError>
    where
        S: RecordSink + ?Sized,
    {
        if self.shutdown.is_triggered() {
            return Ok(Some(self.finish(ShutdownReason::Requested, sink)));
        }

        let (timeout, idle_wait) = self.wait_budget(Instant::now())?;
        let mut events = self.events.take().ok_or(ConnMgrError::Terminated)?;

        self.state = LoopState::WaitingForReady;
        let polled = self.poll.poll(&mut events, Some(timeout));
        self.state = LoopState::Listening;

        if let Err(e) = polled {
            self.events = Some(events);
            if e.kind() == io::ErrorKind::Interrupted {
                return Ok(None);
            }
            return Err(ConnMgrError::Poll(e));
        }

        if self.shutdown.is_triggered() {
            self.events = Some(events);
            return Ok(Some(self.finish(ShutdownReason::Requested, sink)));
        }

        if idle_wait && events.is_empty() {
            self.events = Some(events);
            tracing::info!(
                idle_ms = self.idle.as_millis() as u64,
                "No connections within idle budget, shutting down"
            );
            return Ok(Some(self.finish(ShutdownReason::IdleTimeout, sink)));
        }

        for event in events.iter() {
            match event.token() {
                LISTENER_TOKEN => self.accept_pending(),
                WAKER_TOKEN => {}
                token => self.handle_readable(ConnectionId::from(token), sink),
            }
        }
        self.events = Some(events);

        self.evict_expired(Instant::now());
        Ok(None)
    }

    /// Release the timer queue, the event buffer and every client.
    ///
    /// The listener stays open; see [`close_listener`](Self::close_listener).
    pub fn shutdown(&mut self) {
        self.state = LoopState::ShuttingDown;

        let ids: Vec<ConnectionId> = self.connections.keys().copied().collect();
        for id in ids {
            self.teardown(id, CloseReason::Shutdown);
        }
        if let Some(timers) = self.timers.take() {
            let pending = timers.release();
            tracing::debug!(pending, "Timer queue released");
        }
        self.events = None;
    }

    /// Deregister and close the listening socket.
    pub fn close_listener(&mut self) {
        if let Some(mut listener) = self.listener.take() {
            if let Err(e) = listener.deregister(self.poll.registry()) {
                tracing::warn!(error = %e, "Listener deregister failed");
            }
            tracing::info!(address = %listener.local_addr(), "Listener closed");
        }
        if self.timers.is_none() {
            self.state = LoopState::Terminated;
        }
    }

    /// Handle that stops `run` from another thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Bound address while the listener is open.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().map(Listener::local_addr)
    }

    /// Number of live client connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Current loop state.
    pub fn state(&self) -> LoopState {
        self.state
    }

    fn finish<S>(&mut self, reason: ShutdownReason, sink: &mut S) -> ShutdownReason
    where
        S: RecordSink + ?Sized,
    {
        self.shutdown();
        self.close_listener();
        if let Err(e) = sink.flush() {
            tracing::error!(error = %e, "Sink flush failed");
        }
        tracing::info!(?reason, "Connection manager stopped");
        reason
    }

    /// Time to block and whether this is an idle-budget wait.
    fn wait_budget(&self, now: Instant) -> Result<(Duration, bool), ConnMgrError> {
        let timers = self.timers.as_ref().ok_or(ConnMgrError::Terminated)?;
        Ok(match timers.time_until_next(now) {
            Some(wait) => (wait, false),
            None => (self.idle, true),
        })
    }

    fn accept_pending(&mut self) {
        loop {
            let Some(listener) = self.listener.as_ref() else {
                return;
            };
            match listener.accept() {
                Ok((stream, peer)) => self.register_client(stream, peer),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::Interrupted | io::ErrorKind::ConnectionAborted
                    ) =>
                {
                    continue
                }
                Err(e) => {
                    let err = ConnMgrError::Accept(e);
                    tracing::warn!(error = %err, "Accept failed");
                    self.rearm_listener();
                    return;
                }
            }
        }
    }

    /// Stopping the drain early leaves the edge consumed with connections
    /// still queued; re-arming makes the next poll report them.
    fn rearm_listener(&mut self) {
        let Some(listener) = self.listener.as_mut() else {
            return;
        };
        if let Err(e) = listener.reregister(self.poll.registry(), LISTENER_TOKEN) {
            tracing::warn!(error = %e, "Listener re-arm failed");
        }
    }

    fn register_client(&mut self, stream: TcpStream, peer: SocketAddr) {
        let Some(timers) = self.timers.as_mut() else {
            return;
        };

        let id = ConnectionId::new();
        let mut connection = Connection::new(id, stream, peer);
        if let Err(e) = connection.register(self.poll.registry()) {
            tracing::warn!(connection_id = %id, peer = %peer, error = %e, "Register failed");
            return;
        }
        timers.schedule(id, Instant::now() + self.idle);
        self.connections.insert(id, connection);

        metrics::record_connection_accepted();
        metrics::record_active_connections(self.connections.len());
        tracing::info!(connection_id = %id, peer = %peer, "Connection accepted");
    }

    fn handle_readable<S>(&mut self, id: ConnectionId, sink: &mut S)
    where
        S: RecordSink + ?Sized,
    {
        // Already torn down earlier in this batch.
        let Some(connection) = self.connections.get_mut(&id) else {
            return;
        };

        if let Some(timers) = self.timers.as_mut() {
            timers.refresh(id, Instant::now() + self.idle);
        }

        let mut records = Vec::new();
        let outcome = connection.read_records(&mut records);
        self.forward(id, records, sink);

        match outcome {
            ReadOutcome::Drained => {}
            ReadOutcome::PeerClosed => self.teardown(id, CloseReason::PeerClosed),
            ReadOutcome::Failed(source) => {
                let err = ConnMgrError::Read { id, source };
                tracing::warn!(error = %err, "Read failed");
                self.teardown(id, CloseReason::ReadError);
            }
        }
    }

    fn forward<S>(&mut self, id: ConnectionId, records: Vec<SensorRecord>, sink: &mut S)
    where
        S: RecordSink + ?Sized,
    {
        if records.is_empty() {
            return;
        }
        metrics::record_records_received(records.len());

        for record in records {
            tracing::debug!(
                connection_id = %id,
                sensor_id = record.id,
                value = record.value,
                ts = record.ts,
                "Record received"
            );
            if let Err(e) = sink.accept(record) {
                tracing::warn!(connection_id = %id, error = %e, "Sink dropped record");
            }
        }
    }

    fn evict_expired(&mut self, now: Instant) {
        let expired = match self.timers.as_mut() {
            Some(timers) => timers.evict_expired(now),
            None => return,
        };
        for id in expired {
            self.teardown(id, CloseReason::IdleTimeout);
        }
    }

    fn teardown(&mut self, id: ConnectionId, reason: CloseReason) {
        if let Some(timers) = self.timers.as_mut() {
            timers.cancel(id);
        }
        let Some(connection) = self.connections.remove(&id) else {
            return;
        };

        tracing::info!(
            connection_id = %id,
            peer = %connection.peer(),
            reason = reason.as_str(),
            "Connection closed"
        );
        connection.close(self.poll.registry());

        metrics::record_connection_closed(reason);
        metrics::record_active_connections(self.connections.len());
    }
}
