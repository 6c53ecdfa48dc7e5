//! Tillscan CLI: scan codes and ring up sales from the terminal.
//!
//! Usage:
//!   tillscan scan [OPTIONS]    Run one capture session and print the codes
//!   tillscan sale [OPTIONS]    Scan codes into a sale against a catalog
//!   tillscan search <QUERY>    Search a catalog by product name
//!   tillscan check             Show configuration and validate paths

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tillscan_capture::ScanPolicy;
use tillscan_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "tillscan",
    about = "Barcode capture for the point of sale",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where decode ticks come from.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Tick script replayed as the camera (`miss`, `code <value>`, `fault <msg>`)
    #[arg(long, conflicts_with = "frames")]
    pub script: Option<PathBuf>,

    /// Directory of still images replayed as the camera and decoded as QR codes
    #[arg(long)]
    pub frames: Option<PathBuf>,

    /// Scan policy: single|dedupe|repeat (defaults to the configured policy)
    #[arg(long)]
    pub policy: Option<ScanPolicy>,

    /// Decode attempts per second for --frames
    #[arg(long)]
    pub fps: Option<u32>,

    /// Dismiss the scanner after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one capture session and print every reported code
    Scan {
        #[command(flatten)]
        source: SourceArgs,

        /// Print codes as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Scan codes into a sale draft and record it in a catalog file
    Sale {
        /// Catalog JSON file with stores and products
        #[arg(short, long)]
        catalog: PathBuf,

        #[command(flatten)]
        source: SourceArgs,

        /// Codes typed by hand (barcode, SKU or name); repeatable
        #[arg(short, long = "manual")]
        manual: Vec<String>,

        /// Discount in cents
        #[arg(long, default_value = "0")]
        discount: u64,

        /// Payment method: cash|card|transfer
        #[arg(long, default_value = "cash")]
        payment: String,

        /// Customer name
        #[arg(long)]
        customer: Option<String>,

        /// Build the draft and print it without recording the sale
        #[arg(long)]
        dry_run: bool,
    },

    /// Search a catalog for active products by name or description
    Search {
        /// Catalog JSON file with stores and products
        #[arg(short, long)]
        catalog: PathBuf,

        /// Text to look for
        query: String,

        /// Maximum number of results
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Show the effective configuration and validate paths
    Check {
        /// Frame directory to validate
        #[arg(long)]
        frames: Option<PathBuf>,

        /// Catalog file to validate
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Write the effective configuration to the config file
        #[arg(long)]
        write_config: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    tillscan_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Scan { source, json } => commands::scan::run(&config, source, json).await,
        Commands::Sale {
            catalog,
            source,
            manual,
            discount,
            payment,
            customer,
            dry_run,
        } => {
            commands::sale::run(
                &config,
                commands::sale::SaleArgs {
                    catalog,
                    source,
                    manual,
                    discount,
                    payment,
                    customer,
                    dry_run,
                },
            )
            .await
        }
        Commands::Search {
            catalog,
            query,
            limit,
        } => commands::search::run(catalog, query, limit).await,
        Commands::Check {
            frames,
            catalog,
            write_config,
        } => commands::check::run(&config, frames, catalog, write_config),
    }
}
