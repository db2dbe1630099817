//! Trade queue boundary.
//!
//! The managed queue between ingestor and aggregator is an external
//! collaborator with at-least-once delivery and no ordering guarantee.
//! Message bodies are JSON-serialised [`TradeEvent`]s. The channel-backed
//! implementation here round-trips that wire format and is what the
//! server wiring and the test suite run against; a managed backend
//! (SQS-style visibility timeouts, Kafka-style offsets) implements the
//! same two traits.

use crate::{error::QueueError, event::TradeEvent};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Producer side of the trade queue.
#[async_trait]
pub trait TradePublisher: Send + Sync {
    /// Enqueue one event. Must not block indefinitely; implementations
    /// fail with [`QueueError::Publish`] rather than drop data silently.
    async fn publish(&self, event: &TradeEvent) -> Result<(), QueueError>;
}

/// Consumer side of the trade queue: blocking long-poll receive plus an
/// explicit acknowledgement.
///
/// Until a delivery is acknowledged the queue may re-deliver it; the
/// aggregator's dedup window absorbs that. Poison deliveries (bodies that
/// fail [`Delivery::parse`]) are acknowledged after logging so they never
/// block the queue.
#[async_trait]
pub trait TradeConsumer: Send {
    async fn receive(&mut self) -> Result<Delivery, QueueError>;

    async fn ack(&mut self, delivery: Delivery) -> Result<(), QueueError>;
}

/// One received queue message, still holding the raw body so poison
/// payloads can be logged and acknowledged without a parsed event.
#[derive(Debug)]
pub struct Delivery {
    body: String,
}

impl Delivery {
    pub fn new(body: String) -> Self {
        Self { body }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn parse(&self) -> Result<TradeEvent, QueueError> {
        serde_json::from_str(&self.body).map_err(|error| QueueError::Payload(error.to_string()))
    }
}

/// Bounded in-process trade queue round-tripping the JSON wire format.
pub fn channel_queue(capacity: usize) -> (ChannelPublisher, ChannelConsumer) {
    let (tx, rx) = mpsc::channel(capacity);
    (ChannelPublisher { tx }, ChannelConsumer { rx })
}

#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: mpsc::Sender<String>,
}

#[async_trait]
impl TradePublisher for ChannelPublisher {
    async fn publish(&self, event: &TradeEvent) -> Result<(), QueueError> {
        let body = serde_json::to_string(event)?;
        self.tx
            .send(body)
            .await
            .map_err(|_| QueueError::Publish("queue receiver dropped".to_string()))
    }
}

#[derive(Debug)]
pub struct ChannelConsumer {
    rx: mpsc::Receiver<String>,
}

#[async_trait]
impl TradeConsumer for ChannelConsumer {
    async fn receive(&mut self) -> Result<Delivery, QueueError> {
        match self.rx.recv().await {
            Some(body) => Ok(Delivery::new(body)),
            None => Err(QueueError::Closed),
        }
    }

    async fn ack(&mut self, _delivery: Delivery) -> Result<(), QueueError> {
        // channel delivery is consumed on receive; nothing to settle
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Symbol;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn event() -> TradeEvent {
        let now = Utc::now();
        TradeEvent::new(Symbol::new("BTCUSDT"), 1, dec!(100), dec!(0.5), now, now)
    }

    #[tokio::test]
    async fn test_publish_receive_round_trip() {
        let (publisher, mut consumer) = channel_queue(8);
        let input = event();

        publisher.publish(&input).await.unwrap();

        let delivery = consumer.receive().await.unwrap();
        let actual = delivery.parse().unwrap();
        consumer.ack(delivery).await.unwrap();

        assert_eq!(actual, input);
    }

    #[tokio::test]
    async fn test_poison_body_is_parse_error_not_receive_error() {
        let delivery = Delivery::new("not json".to_string());
        assert!(matches!(delivery.parse(), Err(QueueError::Payload(_))));
    }

    #[tokio::test]
    async fn test_receive_on_closed_queue() {
        let (publisher, mut consumer) = channel_queue(8);
        drop(publisher);
        assert!(matches!(consumer.receive().await, Err(QueueError::Closed)));
    }

    #[tokio::test]
    async fn test_publish_after_consumer_dropped() {
        let (publisher, consumer) = channel_queue(8);
        drop(consumer);
        assert!(matches!(
            publisher.publish(&event()).await,
            Err(QueueError::Publish(_))
        ));
    }
}
