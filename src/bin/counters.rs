//! Counters - operator tool for storefront document codes
//!
//! Issues codes, inspects and resets counters, and runs the legacy code
//! backfill against the database named by `DATABASE_URL`.
//!
//! # Usage
//! ```sh
//! DATABASE_URL=sqlite://storefront.db cargo run --bin counters -- quote
//! cargo run --bin counters -- backfill
//! cargo run --bin counters -- show
//! ```
//!
//! Results go to stdout; logs go to stderr (filter with `RUST_LOG`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use storefront::application::bootstrap::PersistenceBootstrap;
use storefront::config::Config;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "Storefront document code counters", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue the next number of a named counter
    Next {
        /// Counter name (e.g. quote, order)
        name: String,
    },
    /// Issue the next quote code (COT-<n>)
    Quote,
    /// Issue the next order code (ORD-<n>)
    Order,
    /// Print counters as JSON
    Show {
        /// Only this counter
        name: Option<String>,
    },
    /// Force a counter to an exact value; the next code will be value + 1
    Reset {
        name: String,
        value: u64,
    },
    /// Assign codes to legacy documents and move counters past them
    Backfill,
    /// Raise counters to the highest stored code without touching documents
    Sync,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stderr_layer)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    let persistence = PersistenceBootstrap::init(&config).await?;
    let codes = persistence.code_generator();

    match cli.command {
        Commands::Next { name } => {
            let value = codes
                .next_sequential_number(&name)
                .await
                .with_context(|| format!("Could not issue a number for {}", name))?;
            println!("{}", value);
        }
        Commands::Quote => {
            let code = codes
                .generate_quote_code()
                .await
                .context("Could not issue a quote code")?;
            println!("{}", code);
        }
        Commands::Order => {
            let code = codes
                .generate_order_code()
                .await
                .context("Could not issue an order code")?;
            println!("{}", code);
        }
        Commands::Show { name: None } => {
            let counters = codes.counters().await?;
            println!("{}", serde_json::to_string_pretty(&counters)?);
        }
        Commands::Show { name: Some(name) } => {
            let counter = codes
                .counter(&name)
                .await
                .with_context(|| format!("Could not read counter {:?}", name))?
                .with_context(|| format!("Counter {} has never been used", name))?;
            println!("{}", serde_json::to_string_pretty(&[counter])?);
        }
        Commands::Reset { name, value } => {
            codes.reset_counter(&name, value).await?;
            println!("{} = {}", name, value);
        }
        Commands::Backfill => {
            let reports = persistence.backfill().run().await?;
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        Commands::Sync => {
            let reports = persistence.backfill().sync_counters().await?;
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
    }

    persistence.db.pool.close().await;
    info!("Done.");
    Ok(())
}
