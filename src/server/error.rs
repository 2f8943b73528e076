//! Connection manager errors.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::net::connection::ConnectionId;
use crate::net::listener::{MAX_PORT, MIN_PORT};

/// Which step of listener setup failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStage {
    Socket,
    Bind,
    Listen,
    PollCreate,
    Register,
}

impl SetupStage {
    /// Adapter for `map_err` that tags an I/O error with this stage.
    pub fn wrap(self) -> impl Fn(io::Error) -> ConnMgrError {
        move |source| ConnMgrError::SocketSetup {
            stage: self,
            source,
        }
    }
}

impl fmt::Display for SetupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SetupStage::Socket => "socket",
            SetupStage::Bind => "bind",
            SetupStage::Listen => "listen",
            SetupStage::PollCreate => "poll create",
            SetupStage::Register => "register",
        };
        f.write_str(name)
    }
}

/// Everything the connection manager can fail with.
#[derive(Debug, Error)]
pub enum ConnMgrError {
    /// The port is outside `[MIN_PORT, MAX_PORT)`. Nothing was created.
    #[error("port {port} is outside [{min}, {max})", min = MIN_PORT, max = MAX_PORT)]
    Address { port: u32 },

    /// Listener or multiplexer setup failed. Fatal.
    #[error("{stage} failed: {source}")]
    SocketSetup {
        stage: SetupStage,
        #[source]
        source: io::Error,
    },

    /// Accepting a client failed. Logged; the loop keeps going.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// Reading from a client failed. The connection is torn down.
    #[error("read from {id} failed: {source}")]
    Read {
        id: ConnectionId,
        #[source]
        source: io::Error,
    },

    /// The manager was already shut down.
    #[error("connection manager has been shut down")]
    Terminated,

    /// Waiting on the multiplexer failed.
    #[error("poll failed: {0}")]
    Poll(#[source] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        assert_eq!(
            ConnMgrError::Address { port: 80 }.to_string(),
            "port 80 is outside [1024, 65536)"
        );

        let err = SetupStage::Listen.wrap()(io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(err.to_string(), "listen failed: boom");
        assert!(std::error::Error::source(&err).is_some());
    }
}
