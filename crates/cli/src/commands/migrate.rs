//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! os-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `ORDERS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Migrations live in `crates/service/migrations/` and are embedded at
//! compile time.

use secrecy::ExposeSecret;
use sqlx::PgPool;

use order_stream_service::config::get_database_url;

use super::CliError;

/// Run the order store migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails,
/// or a migration fails to apply.
pub async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let database_url = get_database_url("ORDERS_DATABASE_URL")?;

    tracing::info!("Connecting to orders database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Running order store migrations...");
    sqlx::migrate!("../service/migrations").run(&pool).await?;

    tracing::info!("Order store migrations complete!");
    Ok(())
}
