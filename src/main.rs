//! IoT honeypot binary.
//!
//! Brings up the reactor task, a 30-second status monitor, and a ctrl-c
//! shutdown path. For authorized security research only.

use clap::Parser;
use honeypot::config::{
    HoneypotConfig, CONNECTION_TIMEOUT_MS, DEFAULT_PORTS, MAX_CONCURRENT_CONNECTIONS, VERSION,
};
use honeypot::types::Protocol;
use honeypot::Honeypot;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "honeypot", version, about = "Low-interaction IoT honeypot")]
struct Args {
    /// Listening ports (comma-separated); defaults to the full port set
    #[arg(short, long)]
    ports: Option<String>,

    /// Data directory for the durable log mirror
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Maximum concurrent sessions
    #[arg(long, default_value_t = MAX_CONCURRENT_CONNECTIONS)]
    max_connections: usize,

    /// Session idle timeout in milliseconds
    #[arg(long, default_value_t = CONNECTION_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Disable attack logging (capture still counted in stats)
    #[arg(long)]
    no_logging: bool,

    /// Expose records for off-device upload
    #[arg(long)]
    remote_upload: bool,
}

fn print_banner(ports: &[u16]) {
    let mut sorted = ports.to_vec();
    sorted.sort_unstable();
    let port_list = sorted
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    println!();
    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║                       IoT HONEYPOT                       ║");
    println!("║                     Version {:<8}                     ║", VERSION);
    println!("║                                                          ║");
    println!("║  For authorized security research only.                  ║");
    println!("║  Comply with all applicable laws and regulations.        ║");
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();
    println!("Ports monitored: {}", port_list);
    println!();
}

fn parse_ports(arg: &str) -> Result<Vec<u16>, String> {
    let mut ports = Vec::new();
    for item in arg.split(',') {
        let port: u16 = item
            .trim()
            .parse()
            .map_err(|_| format!("invalid port: {}", item.trim()))?;
        if Protocol::classify(port).is_none() {
            return Err(format!("port {} has no protocol mapping", port));
        }
        ports.push(port);
    }
    Ok(ports)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let ports = match &args.ports {
        Some(list) => match parse_ports(list) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("error: {}", e);
                return;
            }
        },
        None => DEFAULT_PORTS.to_vec(),
    };

    print_banner(&ports);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("honeypot=info".parse().expect("static directive")),
        )
        .init();

    info!("Starting IoT Honeypot v{}", VERSION);

    let config = HoneypotConfig {
        ports,
        max_connections: args.max_connections,
        connection_timeout_ms: args.timeout_ms,
        enable_logging: !args.no_logging,
        enable_remote_upload: args.remote_upload,
        data_dir: args.data_dir,
    };

    let mut pot = match Honeypot::new(config) {
        Ok(pot) => pot,
        Err(e) => {
            error!("Failed to initialize honeypot: {}", e);
            return;
        }
    };

    let handle = pot.handle();

    // Reactor task — owns the honeypot for its whole life.
    let reactor = tokio::spawn(async move {
        if let Err(e) = pot.run().await {
            error!("Honeypot stopped with error: {}", e);
        }
    });

    // Status monitor; reads only stat snapshots.
    let monitor_handle = handle.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(30));
        interval.tick().await; // skip the immediate first tick
        loop {
            interval.tick().await;
            let stats = monitor_handle.stats();
            info!(
                "Status: {} connections | {} attacks logged | {} rate limited",
                stats.total_connections, stats.attacks_logged, stats.rate_limited
            );
        }
    });

    info!("Honeypot system initialized successfully");

    tokio::signal::ctrl_c().await.ok();
    info!("Shutting down...");
    handle.stop();
    reactor.await.ok();
}
