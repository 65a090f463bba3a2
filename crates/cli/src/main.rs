//! Stockroom CLI - outbound shipment draft tools.
//!
//! # Usage
//!
//! ```bash
//! # Merge a shipment document and replay edits against it
//! stockroom replay -i shipment.json -a actions.json
//!
//! # Spread 12 units over the batches in a stock file
//! stockroom allocate -s stock.json -q 12
//!
//! # Fetch a shipment, or the allocation table of one of its items
//! stockroom fetch <invoice-id>
//! stockroom fetch <invoice-id> --stock <item-id>
//!
//! # Apply edits to a live shipment and save them
//! stockroom sync <invoice-id> -a actions.json
//! ```
//!
//! # Commands
//!
//! - `replay` - Replay draft actions offline
//! - `allocate` - Run the allocator over stock lines
//! - `fetch` - Load a shipment from the API
//! - `sync` - Load, edit and save a shipment
//!
//! Results are written to stdout as JSON; logs go to stderr.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stockroom_outbound::LogFormat;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "stockroom")]
#[command(author, version, about = "Stockroom outbound shipment tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a shipment document and replay draft actions against it
    Replay {
        /// Shipment document (JSON)
        #[arg(short, long)]
        invoice: PathBuf,

        /// Actions to dispatch after the merge (JSON array)
        #[arg(short, long)]
        actions: Option<PathBuf>,
    },
    /// Allocate a quantity over stock lines
    Allocate {
        /// Stock lines (JSON array)
        #[arg(short, long)]
        stock: PathBuf,

        /// Item to allocate; defaults to the item of the first stock line
        #[arg(long)]
        item: Option<String>,

        /// Requested quantity, in packs of `--pack-size` or units
        #[arg(short, long)]
        quantity: f64,

        /// Issue pack size; omit to allocate in units
        #[arg(short, long)]
        pack_size: Option<u32>,
    },
    /// Fetch a shipment from the API
    Fetch {
        /// Shipment id
        id: String,

        /// Print the allocation table of this item instead of the draft
        #[arg(long)]
        stock: Option<String>,
    },
    /// Apply draft actions to a live shipment and save them
    Sync {
        /// Shipment id
        id: String,

        /// Actions to dispatch after loading (JSON array)
        #[arg(short, long)]
        actions: PathBuf,

        /// Print the pending line changes without saving
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

/// Logs go to stderr so stdout carries only command output.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "stockroom_outbound=info,stockroom=info".into());

    let format: LogFormat = std::env::var("STOCKROOM_LOG_FORMAT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or_default();
    let is_json = format == LogFormat::Json;
    let json_layer = is_json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer =
        (!is_json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Replay { invoice, actions } => {
            commands::replay::run(&invoice, actions.as_deref())?;
        }
        Commands::Allocate {
            stock,
            item,
            quantity,
            pack_size,
        } => {
            commands::allocate::run(&stock, item.as_deref(), quantity, pack_size)?;
        }
        Commands::Fetch { id, stock } => {
            commands::remote::fetch(&id, stock.as_deref()).await?;
        }
        Commands::Sync {
            id,
            actions,
            dry_run,
        } => {
            commands::remote::sync(&id, &actions, dry_run).await?;
        }
    }
    Ok(())
}
