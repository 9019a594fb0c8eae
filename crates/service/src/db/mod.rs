//! Persistent store for order aggregates.
//!
//! # Database: `orders_db`
//!
//! The store is the source of truth. The in-memory cache is derived from it
//! and can always be rebuilt.
//!
//! ## Tables
//!
//! - `orders` - Order header, keyed by `order_uid`
//! - `delivery` - 1:1 with `orders`
//! - `payment` - 1:1 with `orders`
//! - `items` - Line items; no unique key, replaced wholesale on every save
//!
//! # Migrations
//!
//! Migrations are stored in `crates/service/migrations/` and run via:
//! ```bash
//! cargo run -p order-stream-cli -- migrate
//! ```
//! The service itself never changes the schema.

pub mod orders;

#[cfg(test)]
pub(crate) mod memory;

use std::future::Future;
use std::time::Duration;

use futures::stream::BoxStream;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use order_stream_core::{Order, OrderUid};

pub use orders::PgOrderStore;

/// SQLSTATE classes that describe the server or connection rather than the
/// data: connection exception, transaction rollback (serialization failure,
/// deadlock), insufficient resources, operator intervention, system error.
const TRANSIENT_SQLSTATE_CLASSES: &[&str] = &["08", "40", "53", "57", "58"];

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or aborted the transaction.
    /// Redelivering the same message may succeed.
    #[error("store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    /// The store rejected the data itself (constraint violation, bad
    /// encoding). Redelivering the same payload will fail the same way.
    #[error("data rejected by store: {0}")]
    Data(#[source] sqlx::Error),

    /// No order header exists for the identifier.
    #[error("order {0} not found")]
    NotFound(OrderUid),

    /// Stored rows do not form a complete aggregate.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl StoreError {
    /// Whether the failure is about the store rather than the data.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Whether this is the "no such order" outcome of a lookup.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if is_transient(&err) {
            Self::Unavailable(err)
        } else {
            Self::Data(err)
        }
    }
}

fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| {
            TRANSIENT_SQLSTATE_CLASSES
                .iter()
                .any(|class| code.starts_with(class))
        }),
        _ => false,
    }
}

/// Durable, transactional storage of [`Order`] aggregates.
///
/// Implementations must make [`save`](Self::save) atomic across all four
/// tables and idempotent per `order_uid`.
pub trait OrderStore: Send + Sync {
    /// Upsert header, delivery and payment, then replace the item set, all in
    /// one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if any statement, the transaction start, or the
    /// commit fails. Nothing is written in that case.
    fn save(&self, order: &Order) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Reassemble one order.
    ///
    /// A missing payment row yields a zero-valued payment. A missing header
    /// is [`StoreError::NotFound`]; a missing delivery row is
    /// [`StoreError::DataCorruption`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] as described above or on I/O failure.
    fn load(&self, order_uid: &OrderUid)
    -> impl Future<Output = Result<Order, StoreError>> + Send;

    /// Stream every stored order, newest `date_created` first.
    ///
    /// Each aggregate is loaded as the stream is polled. A failure to load
    /// one order is yielded as an `Err` item; the stream may continue.
    fn load_all(&self) -> BoxStream<'_, Result<Order, StoreError>>;
}

/// Create a `PostgreSQL` connection pool.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
/// * `max_connections` - Upper bound on pooled connections
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
