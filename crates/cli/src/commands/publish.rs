//! Publish orders to the order channel for manual and load testing.
//!
//! # Environment Variables
//!
//! The same `NATS_*` variables the service reads. The stream is created if
//! it does not exist yet, so messages published before the service first
//! starts are kept.

use std::path::PathBuf;

use async_nats::jetstream;
use tracing::info;
use uuid::Uuid;

use order_stream_core::{Order, OrderUid, sample_order};
use order_stream_service::config::NatsConfig;
use order_stream_service::ingest::channel;

use super::CliError;

/// Identifier of the built-in sample order.
const SAMPLE_ORDER_UID: &str = "b563feb7b2b84b6test";

/// Truncated JSON; decoding always fails.
const MALFORMED_PAYLOAD: &[u8] = br#"{"order_uid": "broken", "items": ["#;

/// What to publish.
#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub file: Option<PathBuf>,
    pub order_uid: Option<String>,
    pub count: u32,
    pub malformed: bool,
}

/// Publish according to `options` and wait for each publish ack.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded, or if NATS
/// rejects the connection or any publish.
pub async fn run(options: PublishOptions) -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let config = NatsConfig::from_env()?;
    let file = match &options.file {
        Some(path) => Some(tokio::fs::read(path).await?),
        None => None,
    };
    let payloads = build_payloads(file, &options)?;

    let context: jetstream::Context = channel::connect(&config).await?;
    channel::ensure_stream(&context, &config).await?;

    for payload in payloads {
        let ack = context
            .publish(config.subject.clone(), payload.into())
            .await
            .map_err(|e| CliError::Publish(e.to_string()))?
            .await
            .map_err(|e| CliError::Publish(e.to_string()))?;
        info!(stream = %ack.stream, sequence = ack.sequence, "Published order message");
    }

    info!(count = options.count, subject = %config.subject, "Publishing complete");
    Ok(())
}

/// Build the payloads to publish.
///
/// A file published once without `--uid` goes out byte for byte, so
/// arbitrary (even invalid) JSON can be sent. Everything else is decoded
/// into an [`Order`] and re-encoded.
fn build_payloads(file: Option<Vec<u8>>, options: &PublishOptions) -> Result<Vec<Vec<u8>>, CliError> {
    if options.malformed {
        return Ok((0..options.count).map(|_| MALFORMED_PAYLOAD.to_vec()).collect());
    }

    let template = match file {
        Some(raw) if options.count == 1 && options.order_uid.is_none() => return Ok(vec![raw]),
        Some(raw) => serde_json::from_slice::<Order>(&raw)?,
        None => sample_order(SAMPLE_ORDER_UID),
    };

    (0..options.count)
        .map(|_| {
            let mut order = template.clone();
            order.order_uid = next_order_uid(options)?;
            Ok(serde_json::to_vec(&order)?)
        })
        .collect()
}

fn next_order_uid(options: &PublishOptions) -> Result<OrderUid, CliError> {
    let raw = match (&options.order_uid, options.count) {
        (Some(uid), 1) => uid.clone(),
        (Some(prefix), _) => format!("{prefix}-{}", Uuid::new_v4().simple()),
        (None, 1) => SAMPLE_ORDER_UID.to_string(),
        (None, _) => Uuid::new_v4().simple().to_string(),
    };
    OrderUid::parse(&raw).map_err(|e| CliError::InvalidInput(e.to_string()))
}
