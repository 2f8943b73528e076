//! TCP listener setup.
//!
//! # Responsibilities
//! - Validate the requested port before touching the OS
//! - Create, bind and listen on the socket as separate, separately reported stages
//! - Hand back a non-blocking `mio` listener ready for registration
//! - Drain pending connections on readiness

use std::io;
use std::net::{IpAddr, SocketAddr};

use mio::net::{TcpListener, TcpStream};
use mio::{Interest, Registry, Token};
use socket2::{Domain, Protocol, Socket, Type};

use crate::config::ListenerConfig;
use crate::server::error::{ConnMgrError, SetupStage};

/// Lowest accepted port.
pub const MIN_PORT: u32 = 1024;
/// One past the highest accepted port.
pub const MAX_PORT: u32 = 65536;
/// Default pending-connection backlog.
pub const MAX_PENDING: i32 = 10;

/// Whether `port` lies in `[MIN_PORT, MAX_PORT)`.
pub fn port_in_range(port: u32) -> bool {
    (MIN_PORT..MAX_PORT).contains(&port)
}

/// Checks the port window and narrows to a real port number.
pub fn validate_port(port: u32) -> Result<u16, ConnMgrError> {
    if !port_in_range(port) {
        return Err(ConnMgrError::Address { port });
    }
    u16::try_from(port).map_err(|_| ConnMgrError::Address { port })
}

/// A bound, listening, non-blocking TCP socket.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Validate, create, bind and listen according to `config`.
    ///
    /// Nothing is created when the port is out of range.
    pub fn bind(config: &ListenerConfig) -> Result<Self, ConnMgrError> {
        let port = validate_port(config.port)?;
        let ip: IpAddr = config.bind_ip.parse().map_err(|e| ConnMgrError::SocketSetup {
            stage: SetupStage::Bind,
            source: io::Error::new(io::ErrorKind::InvalidInput, e),
        })?;
        let addr = SocketAddr::new(ip, port);

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(SetupStage::Socket.wrap())?;
        socket
            .set_reuse_address(true)
            .map_err(SetupStage::Socket.wrap())?;
        socket
            .bind(&addr.into())
            .map_err(SetupStage::Bind.wrap())?;
        socket
            .listen(config.backlog)
            .map_err(SetupStage::Listen.wrap())?;
        socket
            .set_nonblocking(true)
            .map_err(SetupStage::Listen.wrap())?;

        let std_listener: std::net::TcpListener = socket.into();
        let local_addr = std_listener
            .local_addr()
            .map_err(SetupStage::Bind.wrap())?;
        let inner = TcpListener::from_std(std_listener);

        tracing::info!(
            address = %local_addr,
            backlog = config.backlog,
            "Listener bound"
        );

        Ok(Self { inner, local_addr })
    }

    /// Register for read-readiness under `token`.
    pub fn register(&mut self, registry: &Registry, token: Token) -> Result<(), ConnMgrError> {
        registry
            .register(&mut self.inner, token, Interest::READABLE)
            .map_err(SetupStage::Register.wrap())
    }

    /// Re-arm read-readiness so connections already queued are reported on
    /// the next poll.
    pub fn reregister(&mut self, registry: &Registry, token: Token) -> io::Result<()> {
        registry.reregister(&mut self.inner, token, Interest::READABLE)
    }

    /// Remove from the multiplexer.
    pub fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        registry.deregister(&mut self.inner)
    }

    /// Accept one pending connection.
    pub fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        self.inner.accept()
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
