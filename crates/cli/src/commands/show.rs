//! Print one order straight from the store, bypassing the service cache.

use order_stream_core::OrderUid;
use order_stream_service::config::get_database_url;
use order_stream_service::db::{self, OrderStore, PgOrderStore};

use super::CliError;

/// Load `order_uid` and print it as pretty JSON.
///
/// # Errors
///
/// Returns an error if the identifier is invalid, the store cannot be
/// reached, or the stored rows are incomplete. A missing order is reported,
/// not returned as an error.
pub async fn run(order_uid: &str) -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let order_uid = OrderUid::parse(order_uid).map_err(|e| CliError::InvalidInput(e.to_string()))?;
    let database_url = get_database_url("ORDERS_DATABASE_URL")?;
    let pool = db::create_pool(&database_url, 2).await?;
    let store = PgOrderStore::new(pool);

    match store.load(&order_uid).await {
        Ok(order) => {
            #[allow(clippy::print_stdout)]
            {
                println!("{}", serde_json::to_string_pretty(&order)?);
            }
        }
        Err(e) if e.is_not_found() => {
            tracing::warn!(order_uid = %order_uid, "Order not found");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
