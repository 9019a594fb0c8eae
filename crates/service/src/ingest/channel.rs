//! NATS `JetStream` binding for the ingestion consumer.
//!
//! Orders arrive on a stream through a durable pull consumer with explicit
//! acknowledgment. The server remembers the acknowledged position under the
//! durable name, so a restarted process resumes where it stopped and any
//! message left unacknowledged is redelivered once `ack_wait` elapses.

use std::fmt;
use std::future::Future;

use async_nats::jetstream::{
    self,
    consumer::{AckPolicy, DeliverPolicy, PullConsumer, pull},
    stream,
};
use futures::{Stream, StreamExt};
use secrecy::ExposeSecret;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::IngestHandler;
use crate::config::NatsConfig;
use crate::db::OrderStore;

/// Errors setting up or running the subscription.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to connect to NATS: {0}")]
    Connect(#[source] async_nats::Error),

    #[error("failed to get or create stream: {0}")]
    Stream(#[source] async_nats::Error),

    #[error("failed to get or create consumer: {0}")]
    Consumer(#[source] async_nats::Error),

    #[error("failed to open message stream: {0}")]
    Messages(#[source] async_nats::Error),
}

/// A received message that can be acknowledged.
pub trait Delivery {
    /// Raw message body.
    fn payload(&self) -> &[u8];

    /// Position in the stream, used for logging only.
    fn sequence(&self) -> u64;

    /// Tell the server the message is done with.
    fn acknowledge(&self) -> impl Future<Output = Result<(), async_nats::Error>> + Send;
}

impl Delivery for jetstream::Message {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn sequence(&self) -> u64 {
        self.info().map(|info| info.stream_sequence).unwrap_or_default()
    }

    async fn acknowledge(&self) -> Result<(), async_nats::Error> {
        self.ack().await
    }
}

/// Connect to NATS and return a `JetStream` context.
///
/// # Errors
///
/// Returns `ChannelError::Connect` if the server cannot be reached or
/// rejects the credentials.
pub async fn connect(config: &NatsConfig) -> Result<jetstream::Context, ChannelError> {
    let mut options = async_nats::ConnectOptions::new().name("order-stream");
    if let Some(token) = &config.token {
        options = options.token(token.expose_secret().to_owned());
    }

    let client = options
        .connect(config.url.as_str())
        .await
        .map_err(|e| ChannelError::Connect(e.into()))?;

    info!(url = %config.url, "Connected to NATS");
    Ok(jetstream::new(client))
}

/// Get or create the order stream and the durable pull consumer on it.
///
/// # Errors
///
/// Returns `ChannelError::Stream` or `ChannelError::Consumer` if the server
/// refuses either, for example because an existing stream or consumer has an
/// incompatible configuration.
pub async fn subscribe(
    context: &jetstream::Context,
    config: &NatsConfig,
) -> Result<PullConsumer, ChannelError> {
    let stream = ensure_stream(context, config).await?;

    let consumer = stream
        .get_or_create_consumer(
            &config.durable_name,
            pull::Config {
                durable_name: Some(config.durable_name.clone()),
                filter_subject: config.subject.clone(),
                deliver_policy: DeliverPolicy::All,
                ack_policy: AckPolicy::Explicit,
                ack_wait: config.ack_wait,
                ..Default::default()
            },
        )
        .await
        .map_err(|e| ChannelError::Consumer(e.into()))?;

    info!(
        stream = %config.stream,
        subject = %config.subject,
        durable_name = %config.durable_name,
        ack_wait_secs = config.ack_wait.as_secs(),
        "Subscribed to order channel"
    );
    Ok(consumer)
}

/// Get or create the order stream.
///
/// Publishers call this too, so publishing before the service has ever run
/// still lands messages in the stream.
///
/// # Errors
///
/// Returns `ChannelError::Stream` if the server refuses.
pub async fn ensure_stream(
    context: &jetstream::Context,
    config: &NatsConfig,
) -> Result<stream::Stream, ChannelError> {
    context
        .get_or_create_stream(stream::Config {
            name: config.stream.clone(),
            subjects: vec![config.subject.clone()],
            ..Default::default()
        })
        .await
        .map_err(|e| ChannelError::Stream(e.into()))
}

/// Pull messages and feed them through `handler` until `shutdown` fires.
///
/// # Errors
///
/// Returns `ChannelError::Messages` if the message stream cannot be opened.
/// Errors on individual messages are logged and skipped.
#[instrument(skip_all)]
pub async fn run<S: OrderStore>(
    consumer: PullConsumer,
    handler: IngestHandler<S>,
    shutdown: CancellationToken,
) -> Result<(), ChannelError> {
    let messages = consumer
        .messages()
        .await
        .map_err(|e| ChannelError::Messages(e.into()))?;

    consume(messages, &handler, &shutdown).await;
    Ok(())
}

/// Handle `messages` one at a time until the stream ends or `shutdown`
/// fires.
///
/// Cancellation is checked only between messages, so the in-flight message
/// finishes (including its ack) before the loop exits. Only messages whose
/// [`Outcome`](super::Outcome) says so are acknowledged; the rest stay with
/// the server for redelivery.
pub async fn consume<S, M, E>(
    mut messages: impl Stream<Item = Result<M, E>> + Unpin,
    handler: &IngestHandler<S>,
    shutdown: &CancellationToken,
) where
    S: OrderStore,
    M: Delivery,
    E: fmt::Display,
{
    loop {
        let next = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                info!("Shutdown requested, stopping order consumer");
                break;
            }
            next = messages.next() => next,
        };

        let Some(message) = next else {
            warn!("Order message stream ended");
            break;
        };

        let message = match message {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Error receiving order message");
                continue;
            }
        };

        let sequence = message.sequence();
        let outcome = handler.handle(message.payload(), sequence).await;

        if outcome.should_ack() {
            if let Err(e) = message.acknowledge().await {
                // Unacked means redelivered; the save is idempotent.
                warn!(sequence, error = %e, "Failed to acknowledge message");
            }
        } else {
            debug!(sequence, "Message left for redelivery");
        }
    }
}
