//! Bitbox Server Binary
//!
//! Starts the TCP server for Bitbox.

use std::sync::Arc;

use bitbox::network::Server;
use bitbox::{Config, Engine};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

/// What the eviction limits count
#[derive(Debug, Clone, Copy, ValueEnum)]
enum LimitKind {
    /// Resident arrays
    Items,
    /// Summed array bytes
    Bytes,
}

/// Bitbox Server
#[derive(Parser, Debug)]
#[command(name = "bitbox-server")]
#[command(about = "Sparse bit-set store with LRU spill to disk")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./bitbox_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:9090")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Unit of the eviction limits
    #[arg(long, value_enum, default_value = "items")]
    limit_kind: LimitKind,

    /// Soft limit: evict gradually above this
    #[arg(long, default_value = "10000")]
    soft_limit: usize,

    /// Hard limit: evict before replying above this
    #[arg(long, default_value = "12000")]
    hard_limit: usize,

    /// Maintenance tick interval in milliseconds
    #[arg(long, default_value = "50")]
    maintenance_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bitbox=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("Bitbox Server v{}", bitbox::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let builder = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .maintenance_interval_ms(args.maintenance_ms);
    let config = match args.limit_kind {
        LimitKind::Items => builder.item_limits(args.soft_limit, args.hard_limit),
        LimitKind::Bytes => builder.byte_limits(args.soft_limit, args.hard_limit),
    }
    .build();

    // Open engine
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    // Runs until a client sends SHUTDOWN
    let mut server = Server::new(config, engine);
    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
