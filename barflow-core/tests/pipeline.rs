//! End-to-end flow: publish trades onto the queue, drain them through the
//! aggregator, evaluate the anomaly rules on the stored bars.

use barflow_core::{
    AggregatorConfig, Aggregator, AnomalyEngine, AnomalyThresholds, AlertSink, BarStore,
    IngestOutcome, MemoryAlertSink, MemoryArchive, MemoryBarStore, Symbol, TradeConsumer,
    TradeEvent, TradePublisher, channel_queue,
    alert::AlertKind,
    de::datetime_utc_from_epoch_duration,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::{sync::Arc, time::Duration};

fn ts(epoch_secs: u64) -> DateTime<Utc> {
    datetime_utc_from_epoch_duration(Duration::from_secs(epoch_secs))
}

fn trade(trade_id: u64, price: Decimal, quantity: Decimal, time: DateTime<Utc>) -> TradeEvent {
    TradeEvent::new(Symbol::new("BTCUSDT"), trade_id, price, quantity, time, time)
}

#[tokio::test]
async fn test_queue_to_bars_to_alerts() {
    let (publisher, mut consumer) = channel_queue(64);
    let store = Arc::new(MemoryBarStore::new());
    let mut aggregator = Aggregator::new(
        AggregatorConfig::default(),
        store.clone(),
        MemoryArchive::new(),
    );

    // worked scenario: two trades in minute 0, one in minute 1, with the
    // second trade redelivered once
    let trades = vec![
        trade(1, dec!(100), dec!(1), ts(10)),
        trade(2, dec!(105), dec!(2), ts(40)),
        trade(2, dec!(105), dec!(2), ts(40)),
        trade(3, dec!(95), dec!(1), ts(65)),
    ];
    for event in &trades {
        publisher.publish(event).await.unwrap();
    }
    drop(publisher);

    let mut applied = 0;
    let mut duplicates = 0;
    while let Ok(delivery) = consumer.receive().await {
        let event = delivery.parse().unwrap();
        match aggregator.ingest(event).await.unwrap() {
            IngestOutcome::Applied(_) => applied += 1,
            IngestOutcome::Duplicate => duplicates += 1,
            outcome => panic!("unexpected outcome: {outcome:?}"),
        }
        consumer.ack(delivery).await.unwrap();
    }

    assert_eq!(applied, 3);
    assert_eq!(duplicates, 1);

    let symbol = Symbol::new("BTCUSDT");
    let bars = store.recent(&symbol, 10).await.unwrap();
    assert_eq!(bars.len(), 2);

    // newest first: the minute-1 bar
    assert_eq!(bars[0].bucket_start, ts(60));
    assert_eq!(bars[0].open, dec!(95));
    assert_eq!(bars[0].close, dec!(95));
    assert_eq!(bars[0].volume, dec!(1));

    // the minute-0 bar, unaffected by the duplicate delivery
    assert_eq!(bars[1].bucket_start, ts(0));
    assert_eq!(bars[1].open, dec!(100));
    assert_eq!(bars[1].high, dec!(105));
    assert_eq!(bars[1].low, dec!(100));
    assert_eq!(bars[1].close, dec!(105));
    assert_eq!(bars[1].volume, dec!(3));
    assert_eq!(bars[1].trade_count, 2);

    // close went 105 -> 95: |95-105|/105 ~= 9.52% >= 5%, price spike fires
    let engine = AnomalyEngine::new(AnomalyThresholds::default());
    let sink = MemoryAlertSink::new();
    for alert in engine.evaluate(&bars) {
        sink.publish(&alert).await.unwrap();
    }

    let alerts = sink.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::PriceSpike);
    assert_eq!(alerts[0].symbol, symbol);
}

#[tokio::test]
async fn test_poison_messages_are_acknowledged_not_fatal() {
    let (publisher, mut consumer) = channel_queue(8);
    let store = Arc::new(MemoryBarStore::new());
    let mut aggregator = Aggregator::new(
        AggregatorConfig::default(),
        store.clone(),
        MemoryArchive::new(),
    );

    publisher.publish(&trade(1, dec!(100), dec!(1), ts(10))).await.unwrap();
    drop(publisher);

    // a malformed body parses to an error but is still acknowledged, and
    // the loop carries on with valid events
    let poison = barflow_core::Delivery::new("{not json".to_string());
    assert!(poison.parse().is_err());
    consumer.ack(poison).await.unwrap();

    let delivery = consumer.receive().await.unwrap();
    let event = delivery.parse().unwrap();
    assert!(matches!(
        aggregator.ingest(event).await.unwrap(),
        IngestOutcome::Applied(_)
    ));
    consumer.ack(delivery).await.unwrap();

    assert_eq!(store.bar_count(), 1);
}
