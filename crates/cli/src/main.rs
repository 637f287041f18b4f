//! Pazar CLI - database migrations and marketplace management.
//!
//! # Usage
//!
//! ```bash
//! # Create or upgrade the marketplace schema
//! pazar-cli migrate
//!
//! # Load the demo stores, products, sizes and stock
//! pazar-cli seed
//!
//! # Set the stock level of product 3 in size 2
//! pazar-cli stock set 3 2 25
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed the demo catalog
//! - `stock set` - Set a stock level outright

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pazar-cli")]
#[command(author, version, about = "Pazar marketplace CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the demo catalog (stores Mavi, Zara and Koton)
    Seed,
    /// Manage stock levels
    Stock {
        #[command(subcommand)]
        action: StockAction,
    },
}

#[derive(Subcommand)]
enum StockAction {
    /// Set the stock level of one product and size
    Set {
        /// Product id
        product_id: i32,

        /// Size id
        size_id: i32,

        /// New quantity
        quantity: u32,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed => commands::seed::demo_catalog().await?,
        Commands::Stock { action } => match action {
            StockAction::Set {
                product_id,
                size_id,
                quantity,
            } => commands::stock::set(product_id, size_id, quantity).await?,
        },
    }
    Ok(())
}
