//! HTTP route handlers for order lookup.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Lookup page
//! GET  /health                 - Health check
//! GET  /health/ready           - Readiness check (database ping)
//!
//! # API (served from the cache only)
//! GET  /api/order/{order_uid}  - One order as JSON, 404 if not cached
//! GET  /api/orders             - Every cached order as a JSON array
//! ```

pub mod home;
pub mod orders;

use axum::{Router, routing::get};

use crate::state::AppState;

/// Create the order API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/order/{order_uid}", get(orders::show))
        .route("/orders", get(orders::index))
}

/// Create all routes for the lookup service.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::index))
        .nest("/api", api_routes())
}
