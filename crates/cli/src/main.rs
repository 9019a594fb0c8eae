//! Order Stream CLI - migrations, test publishing, and store inspection.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! os-cli migrate
//!
//! # Publish the sample order
//! os-cli publish
//!
//! # Publish an order from a file under a new identifier
//! os-cli publish --file order.json --uid A1
//!
//! # Publish 100 sample orders with random identifiers
//! os-cli publish --count 100
//!
//! # Publish a payload the service must discard
//! os-cli publish --malformed
//!
//! # Print one order straight from the store
//! os-cli show b563feb7b2b84b6test
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `publish` - Publish orders to the `JetStream` subject
//! - `show` - Load one order from `PostgreSQL`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::CliError;
use commands::publish::PublishOptions;

#[derive(Parser)]
#[command(name = "os-cli")]
#[command(author, version, about = "Order Stream CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Publish orders to the order channel
    Publish {
        /// JSON file to publish instead of the built-in sample order
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Override the order identifier (used as a prefix with --count)
        #[arg(short, long)]
        uid: Option<String>,

        /// Number of orders to publish; more than one gets fresh identifiers
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        count: u32,

        /// Publish an undecodable payload instead of an order
        #[arg(long, conflicts_with_all = ["file", "uid"])]
        malformed: bool,
    },
    /// Print one order from the store as JSON
    Show {
        /// Order identifier
        order_uid: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Publish {
            file,
            uid,
            count,
            malformed,
        } => {
            commands::publish::run(PublishOptions {
                file,
                order_uid: uid,
                count,
                malformed,
            })
            .await?;
        }
        Commands::Show { order_uid } => commands::show::run(&order_uid).await?,
    }
    Ok(())
}
