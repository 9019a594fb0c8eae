//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::cache::OrderCache;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Lookups read only the cache;
/// the pool is here for the readiness check.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pool: PgPool,
    cache: OrderCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `pool` - `PostgreSQL` connection pool
    /// * `cache` - Handle to the order cache the consumer writes into
    #[must_use]
    pub fn new(pool: PgPool, cache: OrderCache) -> Self {
        Self {
            inner: Arc::new(AppStateInner { pool, cache }),
        }
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the order cache.
    #[must_use]
    pub fn cache(&self) -> &OrderCache {
        &self.inner.cache
    }
}
