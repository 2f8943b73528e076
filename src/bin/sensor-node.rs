//! Minimal sensor node: connects to a gateway and sends readings.

use std::io::Write;
use std::net::TcpStream;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::Parser;

use sensor_gateway::SensorRecord;

#[derive(Parser, Debug)]
#[command(name = "sensor-node")]
#[command(about = "Sends sensor readings to a sensor-gateway", long_about = None)]
struct Cli {
    /// Gateway address
    #[arg(short, long, default_value = "127.0.0.1:5678")]
    gateway: String,

    /// Sensor identifier
    #[arg(short, long, default_value_t = 1)]
    id: u16,

    /// Number of readings to send
    #[arg(short, long, default_value_t = 10)]
    count: u32,

    /// Pause between readings in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// First reading; each following one adds `step`
    #[arg(long, default_value_t = 20.0)]
    start: f64,

    #[arg(long, default_value_t = 0.5)]
    step: f64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut stream = match TcpStream::connect(&cli.gateway) {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("sensor-node: cannot connect to {}: {e}", cli.gateway);
            return ExitCode::FAILURE;
        }
    };

    for n in 0..cli.count {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        let record = SensorRecord::new(cli.id, cli.start + cli.step * f64::from(n), ts);

        if let Err(e) = stream.write_all(&record.to_bytes()) {
            eprintln!("sensor-node: send failed: {e}");
            return ExitCode::FAILURE;
        }
        println!("sent id={} value={:.2} ts={}", record.id, record.value, record.ts);

        if n + 1 < cli.count {
            thread::sleep(Duration::from_millis(cli.interval_ms));
        }
    }

    ExitCode::SUCCESS
}
