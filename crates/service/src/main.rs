//! Order Stream - order ingestion and lookup service.
//!
//! # Architecture
//!
//! - NATS `JetStream` durable pull consumer feeding the ingestion handler
//! - `PostgreSQL` as the source of truth (`orders`, `delivery`, `payment`, `items`)
//! - In-memory cache rehydrated from the store at startup
//! - Axum lookup API served from the cache only
//!
//! Migrations are NOT run here. Apply them with
//! `cargo run -p order-stream-cli -- migrate`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, routing::get};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use order_stream_service::cache::OrderCache;
use order_stream_service::config::ServiceConfig;
use order_stream_service::db::{self, PgOrderStore};
use order_stream_service::ingest::{IngestHandler, channel};
use order_stream_service::rehydrate::rehydrate;
use order_stream_service::routes;
use order_stream_service::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ServiceConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry.dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry
                .environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry.sample_rate,
            traces_sample_rate: config.sentry.traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = ServiceConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "order_stream_service=info,order_stream=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    tracing::debug!(?config, "Configuration loaded");

    let pool = db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    let store = PgOrderStore::new(pool.clone());
    let cache = OrderCache::new();

    // The cache must be warm before the first message or request
    rehydrate(&store, &cache).await;

    let context = channel::connect(&config.nats)
        .await
        .expect("Failed to connect to NATS");
    let consumer = channel::subscribe(&context, &config.nats)
        .await
        .expect("Failed to subscribe to order channel");

    let shutdown = CancellationToken::new();
    let handler = IngestHandler::new(store, cache.clone());
    let consumer_task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            let result = channel::run(consumer, handler, shutdown.clone()).await;
            // A consumer that stops on its own takes the server down with it
            shutdown.cancel();
            result
        }
    });

    let state = AppState::new(pool, cache);

    let app = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!("order-stream listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .expect("Server error");

    shutdown.cancel();
    match consumer_task.await {
        Ok(Ok(())) => tracing::info!("Order consumer stopped"),
        Ok(Err(e)) => tracing::error!(error = %e, "Order consumer failed"),
        Err(e) => tracing::error!(error = %e, "Order consumer task panicked"),
    }
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM) or for `shutdown` to be
/// cancelled by the consumer task.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
        () = shutdown.cancelled() => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
