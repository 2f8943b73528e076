//! Exit codes of the `sensor-gateway` binary.

use std::process::{Command, Output};

use sensor_gateway::net::port_in_range;

fn gateway(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sensor-gateway"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap()
}

fn free_port() -> String {
    loop {
        let scratch = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = u32::from(scratch.local_addr().unwrap().port());
        if port_in_range(port) {
            return port.to_string();
        }
    }
}

#[test]
fn idle_timeout_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("recv.bin");
    let port = free_port();

    let result = gateway(&[
        &port,
        "--idle-timeout-ms",
        "100",
        "--output",
        output.to_str().unwrap(),
    ]);

    assert_eq!(result.status.code(), Some(1), "{result:?}");
    assert_eq!(std::fs::metadata(&output).unwrap().len(), 0);
}

#[test]
fn privileged_port_exits_with_two() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("recv.bin");

    let result = gateway(&["80", "--output", output.to_str().unwrap()]);

    assert_eq!(result.status.code(), Some(2), "{result:?}");
    assert!(!output.exists());
}

#[test]
fn unreadable_config_exits_with_two() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");

    let result = gateway(&["--config", missing.to_str().unwrap()]);

    assert_eq!(result.status.code(), Some(2), "{result:?}");
}
