//! Pool CLI entry point
//!
//! Configuration is loaded from environment variables (via .env file);
//! command-line arguments override environment variables.
//!
//! Usage:
//!   pool serve          - Start the ledger API server
//!   pool quote          - Print a returns quote for a principal/rate/term

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pool_core::types::Timestamp;
use pool_core::{
    LedgerConfig, LedgerService, MemoryStore, ReturnsCalculator, SledStore,
};

#[derive(Parser)]
#[command(name = "pool", about = "Funding-pool ledger", version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the ledger API server
    Serve {
        /// Bind host (overrides POOL_API_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides POOL_API_PORT)
        #[arg(long)]
        port: Option<u16>,

        /// Sled data directory; in-memory storage when omitted
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Print a returns quote
    Quote {
        /// Principal in the smallest currency unit
        #[arg(long)]
        principal: u64,

        /// Annual rate in basis points
        #[arg(long)]
        rate_bps: u32,

        /// Term in seconds
        #[arg(long)]
        term_secs: u64,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if cli.verbose {
        init_logging("pool_core=debug,pool_api=debug,tower_http=debug");
    } else {
        init_logging("pool_core=info,pool_api=info");
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match cli.command {
        Command::Serve {
            host,
            port,
            data_dir,
        } => {
            let mut api_config = pool_api::ApiConfig::from_env();
            if let Some(host) = host {
                api_config.host = host;
            }
            if let Some(port) = port {
                api_config.port = port;
            }

            let ledger_config = LedgerConfig::from_env();
            let service = match data_dir {
                Some(path) => {
                    tracing::info!(path = %path.display(), "Using sled storage");
                    LedgerService::with_defaults(ledger_config, Arc::new(SledStore::open(path)?))
                }
                None => {
                    tracing::info!("Using in-memory storage");
                    LedgerService::with_defaults(ledger_config, Arc::new(MemoryStore::new()))
                }
            };

            pool_api::run_server(&api_config, Arc::new(service)).await
        }
        Command::Quote {
            principal,
            rate_bps,
            term_secs,
        } => {
            let quote =
                ReturnsCalculator::compute_returns(principal, rate_bps, term_secs, Timestamp::now())?;
            println!("principal:       {principal}");
            println!("interest:        {}", quote.interest);
            println!("total at term:   {}", quote.total);
            println!("matures at:      {}", quote.maturity_at);
            Ok(())
        }
    }
}

fn init_logging(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
