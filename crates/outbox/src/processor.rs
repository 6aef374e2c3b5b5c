//! Polling processor that drains the outbox to consumers.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::consumer::EventConsumer;
use crate::error::OutboxError;
use crate::store::OutboxStore;

/// Outcome of one polling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub fetched: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Polls the outbox and delivers pending messages to registered consumers.
///
/// A message is marked processed only after every interested consumer
/// accepted it; any failure records the error on the message and leaves it
/// for the next pass. After `max_attempts` failures a message is no longer
/// fetched and waits in the table for manual intervention.
pub struct OutboxProcessor<S: OutboxStore> {
    store: S,
    consumers: Vec<Box<dyn EventConsumer>>,
    batch_size: u32,
    poll_interval: Duration,
    max_attempts: u32,
}

impl<S: OutboxStore> OutboxProcessor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            consumers: Vec::new(),
            batch_size: 50,
            poll_interval: Duration::from_millis(500),
            max_attempts: 5,
        }
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Registers a consumer with this processor.
    pub fn register(&mut self, consumer: Box<dyn EventConsumer>) {
        self.consumers.push(consumer);
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    /// Fetches one batch and delivers it.
    #[tracing::instrument(skip(self))]
    pub async fn run_once(&self) -> Result<BatchStats, OutboxError> {
        let started = std::time::Instant::now();
        let messages = self
            .store
            .fetch_pending(self.batch_size, self.max_attempts)
            .await?;

        let mut stats = BatchStats {
            fetched: messages.len(),
            ..BatchStats::default()
        };

        for message in &messages {
            let mut errors: Vec<String> = Vec::new();
            for consumer in &self.consumers {
                if !consumer.interested_in(message) {
                    continue;
                }
                if let Err(e) = consumer.handle(message).await {
                    errors.push(format!("{}: {e}", consumer.name()));
                }
            }

            if errors.is_empty() {
                self.store.mark_processed(message.id).await?;
                stats.delivered += 1;
                metrics::counter!("outbox_messages_delivered").increment(1);
            } else {
                let error = errors.join("; ");
                tracing::warn!(
                    message_id = %message.id,
                    event_type = %message.event_type,
                    attempts = message.attempts + 1,
                    error = %error,
                    "message delivery failed"
                );
                self.store.mark_failed(message.id, &error).await?;
                stats.failed += 1;
                metrics::counter!("outbox_messages_failed").increment(1);

                if message.attempts + 1 >= self.max_attempts {
                    tracing::error!(
                        message_id = %message.id,
                        event_type = %message.event_type,
                        "message exhausted its delivery attempts"
                    );
                    metrics::counter!("outbox_messages_exhausted").increment(1);
                }
            }
        }

        metrics::histogram!("outbox_batch_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        if stats.delivered > 0 || stats.failed > 0 {
            tracing::info!(
                fetched = stats.fetched,
                delivered = stats.delivered,
                failed = stats.failed,
                "outbox batch complete"
            );
        }

        Ok(stats)
    }

    /// Polls until the shutdown signal flips to `true`.
    ///
    /// Store errors are logged and the loop keeps going; a transient
    /// database outage must not kill the processor.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        tracing::error!(error = %e, "outbox poll failed");
                        metrics::counter!("outbox_poll_errors").increment(1);
                    }
                }
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("outbox processor stopped");
    }
}
