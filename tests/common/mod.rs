//! Shared utilities for integration tests.

use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use sensor_gateway::net::port_in_range;
use sensor_gateway::record::RecordSink;
use sensor_gateway::{
    ConnMgrError, ConnectionManager, GatewayConfig, SensorRecord, ShutdownHandle, ShutdownReason,
};

/// Default config on a port the OS just reported free.
pub fn config_with_idle(idle_ms: u64) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.timeouts.idle_ms = idle_ms;
    config.listener.port = free_port();
    config
}

fn free_port() -> u32 {
    loop {
        let scratch = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = u32::from(scratch.local_addr().unwrap().port());
        if port_in_range(port) {
            return port;
        }
    }
}

/// A connection manager running on its own thread.
pub struct RunningGateway<S> {
    pub addr: SocketAddr,
    pub shutdown: ShutdownHandle,
    thread: JoinHandle<(Result<ShutdownReason, ConnMgrError>, S)>,
}

impl<S> RunningGateway<S> {
    /// Request shutdown and wait for the loop to return.
    pub fn stop(self) -> (Result<ShutdownReason, ConnMgrError>, S) {
        self.shutdown.trigger().unwrap();
        self.join()
    }

    /// Wait for the loop to return on its own.
    pub fn join(self) -> (Result<ShutdownReason, ConnMgrError>, S) {
        self.thread.join().unwrap()
    }
}

/// Bind with `idle_ms` and run against `sink` on a background thread.
///
/// Retries a few times in case another test grabbed the chosen port.
pub fn start_gateway<S>(idle_ms: u64, sink: S) -> RunningGateway<S>
where
    S: RecordSink + Send + 'static,
{
    let mut last_err = None;
    for _ in 0..10 {
        match ConnectionManager::listen(&config_with_idle(idle_ms)) {
            Ok(mut manager) => {
                let addr = manager.local_addr().unwrap();
                let shutdown = manager.shutdown_handle();
                let mut sink = sink;
                let thread = thread::spawn(move || {
                    let result = manager.run(&mut sink);
                    (result, sink)
                });
                return RunningGateway {
                    addr,
                    shutdown,
                    thread,
                };
            }
            Err(e) => last_err = Some(e),
        }
    }
    panic!("could not start gateway: {last_err:?}");
}

/// Connect a blocking client.
pub fn connect(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).unwrap();
    stream.set_nodelay(true).unwrap();
    stream
}

pub fn send(stream: &mut TcpStream, record: SensorRecord) {
    stream.write_all(&record.to_bytes()).unwrap();
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
