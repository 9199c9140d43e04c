//! Bitbox CLI Client
//!
//! Command-line interface for interacting with Bitbox.

use bitbox::network::Client;
use clap::{Parser, Subcommand};

/// Bitbox CLI
#[derive(Parser, Debug)]
#[command(name = "bitbox-cli")]
#[command(about = "CLI for the Bitbox sparse bit-set store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:9090")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read one bit
    Get {
        /// The key to read
        key: String,

        /// Bit index
        index: i64,
    },

    /// Set one or more bits
    Set {
        /// The key to modify
        key: String,

        /// Bit indices
        #[arg(required = true)]
        indices: Vec<i64>,
    },

    /// Show cache occupancy and counters
    Stats,

    /// Ping the server
    Ping,

    /// Write back all data and stop the server
    Shutdown,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> bitbox::Result<()> {
    let mut client = Client::connect(&args.server)?;

    match args.command {
        Commands::Get { key, index } => {
            let bit = client.get_bit(&key, index)?;
            println!("{}", bit as u8);
        }
        Commands::Set { key, indices } => {
            if let [index] = indices[..] {
                client.set_bit(&key, index)?;
            } else {
                client.set_bits(&key, &indices)?;
            }
            println!("OK");
        }
        Commands::Stats => {
            let stats = client.stats()?;
            println!("resident arrays: {}", stats.resident_arrays);
            println!("resident bytes:  {}", stats.resident_bytes);
            println!("dirty arrays:    {}", stats.dirty_arrays);
            println!("loads:           {}", stats.loads);
            println!("creates:         {}", stats.creates);
            println!("evictions:       {}", stats.evictions);
            println!("write-backs:     {}", stats.write_backs);
        }
        Commands::Ping => {
            client.ping()?;
            println!("PONG");
        }
        Commands::Shutdown => {
            client.shutdown()?;
            println!("OK");
        }
    }

    Ok(())
}
