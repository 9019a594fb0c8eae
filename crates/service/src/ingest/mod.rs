//! Ingestion of order messages from the durable channel.
//!
//! Every message goes through the same pipeline:
//!
//! ```text
//! received -> decoded -> validated -> persisted -> cached -> acknowledged
//!                |           |             |
//!                v           v             v
//!            discarded   discarded     withheld (redelivered later)
//! ```
//!
//! The decision to acknowledge is a plain [`Outcome`] value returned by
//! [`IngestHandler::handle`]; the channel runner in [`channel`] only turns
//! it into an ack. Redelivery by the channel is the only retry mechanism.
//! There is no retry counter, so a message the store rejects on every
//! attempt is redelivered indefinitely.

pub mod channel;

use tracing::{debug, error, info, instrument, warn};

use order_stream_core::{Order, OrderUid, ValidationError};

use crate::cache::OrderCache;
use crate::db::{OrderStore, StoreError};

/// Bytes of a rejected payload included in logs.
const PAYLOAD_PREVIEW_BYTES: usize = 256;

/// Why a message was acknowledged without being stored.
#[derive(Debug, thiserror::Error)]
pub enum DiscardReason {
    /// Payload is not a JSON order.
    #[error("undecodable payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// Payload decoded but failed the validation gate.
    #[error("invalid order: {0}")]
    Invalid(#[from] ValidationError),
}

/// What to do with a message once it has been handled.
#[derive(Debug)]
pub enum Outcome {
    /// Persisted and cached. Acknowledge.
    Stored {
        /// Identifier of the stored order.
        order_uid: OrderUid,
    },
    /// Can never succeed. Acknowledge so the channel drains.
    Discarded(DiscardReason),
    /// Store failed. Do not acknowledge; the channel redelivers.
    Withheld(StoreError),
}

impl Outcome {
    /// Whether the message should be acknowledged.
    #[must_use]
    pub const fn should_ack(&self) -> bool {
        !matches!(self, Self::Withheld(_))
    }
}

/// Drives one message through decode, validate, persist, and cache.
///
/// Handling is strictly sequential per subscription: the runner awaits
/// [`handle`](Self::handle) before pulling the next message.
///
/// There is no timeout around the store call. A save that hangs stalls the
/// consumer until the pool or server gives up.
pub struct IngestHandler<S> {
    store: S,
    cache: OrderCache,
}

impl<S: OrderStore> IngestHandler<S> {
    /// Create a handler that writes through `store` into `cache`.
    #[must_use]
    pub const fn new(store: S, cache: OrderCache) -> Self {
        Self { store, cache }
    }

    /// Get a reference to the store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Handle one raw payload.
    ///
    /// `sequence` is the channel's sequence number and is only logged.
    #[instrument(level = "debug", skip(self, payload), fields(bytes = payload.len()))]
    pub async fn handle(&self, payload: &[u8], sequence: u64) -> Outcome {
        debug!("Received order message");

        let order: Order = match serde_json::from_slice(payload) {
            Ok(order) => order,
            Err(e) => {
                warn!(error = %e, payload = %preview(payload), "Discarding undecodable message");
                return Outcome::Discarded(e.into());
            }
        };

        if let Err(e) = order.validate() {
            warn!(error = %e, payload = %preview(payload), "Discarding invalid order");
            return Outcome::Discarded(e.into());
        }

        if let Err(e) = self.store.save(&order).await {
            error!(
                order_uid = %order.order_uid,
                transient = e.is_transient(),
                error = %e,
                "Failed to persist order, leaving message unacknowledged"
            );
            return Outcome::Withheld(e);
        }

        let order_uid = order.order_uid.clone();
        self.cache.set(order_uid.clone(), order);
        info!(order_uid = %order_uid, "Order stored");

        Outcome::Stored { order_uid }
    }
}

/// Lossy UTF-8 prefix of a payload for log lines.
fn preview(payload: &[u8]) -> String {
    let end = payload.len().min(PAYLOAD_PREVIEW_BYTES);
    let mut text = String::from_utf8_lossy(payload.get(..end).unwrap_or_default()).into_owned();
    if payload.len() > end {
        text.push_str("...");
    }
    text
}
