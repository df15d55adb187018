//! netguard-probe
//!
//! Connects to a TCP endpoint, arms the network timeout and performs one
//! monitored blocking read. Useful for checking that a timeout budget
//! actually cuts off a silent peer.
//!
//! ```text
//! netguard-probe --address 10.0.0.5:5432 --timeout-ms 3000
//! {"address":"10.0.0.5:5432","timeout_ms":3000,"outcome":"aborted",...}
//! ```

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use serde::Serialize;

use netguard::config::{self, validation::validate_config, ConfigError, NetguardConfig};
use netguard::lifecycle::{signals, Shutdown};
use netguard::observability::{logging, metrics};
use netguard::scheduler::build_scheduler;
use netguard::{Connection, Error, TcpTransport};

#[derive(Parser)]
#[command(name = "netguard-probe")]
#[command(about = "Read from an endpoint under a network timeout", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Endpoint to probe; overrides `probe.address`.
    #[arg(short, long)]
    address: Option<String>,

    /// Budget in milliseconds; overrides `timeouts.network_timeout_ms`.
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Pretty-print the report.
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum Outcome {
    Data,
    Eof,
    Aborted,
    Error,
}

#[derive(Debug, Serialize)]
struct ProbeReport {
    address: String,
    timeout_ms: u64,
    outcome: Outcome,
    bytes: usize,
    elapsed_ms: u64,
    closed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => NetguardConfig::default(),
    };
    if let Some(address) = cli.address {
        config.probe.address = address;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeouts.network_timeout_ms = timeout_ms;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability.log_level);
    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?);
    }

    let shutdown = Shutdown::new();
    let scheduler = build_scheduler(&config.scheduler, &shutdown)?;

    let address = config.probe.address.clone();
    let transport =
        tokio::task::spawn_blocking(move || TcpTransport::connect(address.as_str())).await??;
    tracing::info!(peer = %transport.peer_addr(), "Connected");

    let conn = Connection::new(transport);
    let timeout_ms = config.timeouts.network_timeout_ms;
    conn.configure_network_timeout(i64::try_from(timeout_ms)?, Some(scheduler))?;

    let reader = conn.clone();
    let read_bytes = config.probe.read_bytes;
    let start = Instant::now();
    let mut read = tokio::task::spawn_blocking(move || {
        let mut buf = vec![0u8; read_bytes];
        reader.execute(|transport| transport.read(&mut buf))
    });

    let finished = tokio::select! {
        res = &mut read => Some(res),
        _ = signals::wait_for_signal() => None,
    };
    let result = match finished {
        Some(res) => res?,
        None => {
            tracing::info!("Interrupted; aborting probe connection");
            conn.abort(None)?;
            read.await?
        }
    };
    let elapsed_ms = start.elapsed().as_millis() as u64;
    shutdown.trigger();

    let (outcome, bytes, error) = match result {
        Ok(0) => (Outcome::Eof, 0, None),
        Ok(n) => (Outcome::Data, n, None),
        Err(e @ Error::Aborted(_)) => (Outcome::Aborted, 0, Some(e.to_string())),
        Err(e) => (Outcome::Error, 0, Some(e.to_string())),
    };
    let report = ProbeReport {
        address: config.probe.address.clone(),
        timeout_ms,
        outcome,
        bytes,
        elapsed_ms,
        closed: conn.is_closed(),
        error,
    };
    conn.close()?;

    let json = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");
    Ok(())
}
