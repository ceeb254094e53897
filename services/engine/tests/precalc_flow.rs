//! End-to-end pre-calculation and delivery flow against the in-memory
//! backends
mod common;

use std::sync::Arc;

use common::{period, selector, CountingSink};
use engine::config::PrecalcConfig;
use engine::delivery::ResultDelivery;
use engine::errors::EngineError;
use engine::ledger::{ExposureLedger, InMemoryExposureLedger};
use engine::precalc::lock::{InMemoryPeriodLock, PeriodLock};
use engine::precalc::{PreCalcScheduler, PrecalcState};
use engine::store::{InMemoryResultStore, ResultStore};
use shared::{Liability, Parity, Pattern, Size};

struct Harness {
    ledger: Arc<InMemoryExposureLedger>,
    lock: Arc<InMemoryPeriodLock>,
    store: Arc<InMemoryResultStore>,
    sink: Arc<CountingSink>,
    scheduler: Arc<PreCalcScheduler>,
    delivery: Arc<ResultDelivery>,
}

fn precalc_config() -> PrecalcConfig {
    PrecalcConfig {
        durations_secs: vec![60],
        timeline: "default".to_string(),
        freeze_offset_secs: 5,
        lock_ttl_ms: 10_000,
        result_ttl_secs: 600,
        ledger_ttl_secs: 3_600,
        tick_interval_ms: 250,
    }
}

async fn harness() -> Harness {
    let ledger = Arc::new(InMemoryExposureLedger::new());
    let lock = Arc::new(InMemoryPeriodLock::new());
    let store = Arc::new(InMemoryResultStore::new());
    let sink = Arc::new(CountingSink::default());
    let selector = selector().await;

    let delivery = Arc::new(ResultDelivery::new(
        ledger.clone(),
        store.clone(),
        selector.clone(),
        sink.clone(),
    ));
    let scheduler = Arc::new(PreCalcScheduler::new(
        ledger.clone(),
        lock.clone(),
        store.clone(),
        selector,
        delivery.clone(),
        precalc_config(),
    ));

    Harness {
        ledger,
        lock,
        store,
        sink,
        scheduler,
        delivery,
    }
}

#[tokio::test]
async fn test_precalculate_then_deliver() {
    let h = harness().await;
    let period = period("20260804000100");

    h.ledger
        .record_bet(
            &period,
            &[
                Pattern::SumParity(Parity::Even),
                Pattern::SumSize(Size::Small),
            ],
            Liability::new(300).unwrap(),
        )
        .await
        .unwrap();

    let record = h.scheduler.precalculate(&period).await.unwrap();
    assert_eq!(h.scheduler.state_of(&period), Some(PrecalcState::Completed));
    assert_eq!(record.combination.sum_parity(), Parity::Odd);
    assert_eq!(record.combination.sum_size(), Size::Big);

    let delivered = h.delivery.get_result(&period).await.unwrap();
    assert!(delivered.precalculated);
    assert_eq!(delivered.combination, record.combination);
    assert_eq!(h.sink.calls(), 1);
}

#[tokio::test]
async fn test_delivery_is_idempotent_and_settles_once() {
    let h = harness().await;
    let period = period("20260804000101");

    h.scheduler.precalculate(&period).await.unwrap();

    let first = h.delivery.get_result(&period).await.unwrap();
    let second = h.delivery.get_result(&period).await.unwrap();

    assert_eq!(first.combination, second.combination);
    assert_eq!(h.sink.calls(), 1);
}

#[tokio::test]
async fn test_lock_contention_is_non_fatal() {
    let h = harness().await;
    let period = period("20260804000102");

    // Another worker already owns this period.
    let token = h.lock.acquire(&period).await.unwrap().unwrap();

    let err = h.scheduler.precalculate(&period).await.unwrap_err();
    assert!(matches!(err, EngineError::DuplicateComputation(_)));
    assert_eq!(h.scheduler.state_of(&period), Some(PrecalcState::Idle));
    assert!(h.store.get(&period).await.unwrap().is_none());

    // Once released, the trigger succeeds.
    h.lock.release(&period, &token).await.unwrap();
    h.scheduler.precalculate(&period).await.unwrap();
    assert_eq!(h.scheduler.state_of(&period), Some(PrecalcState::Completed));
}

#[tokio::test]
async fn test_missing_precalc_falls_back_on_demand() {
    let h = harness().await;
    let period = period("20260804000103");

    h.ledger
        .record_bet(
            &period,
            &[Pattern::SumParity(Parity::Even)],
            Liability::new(500).unwrap(),
        )
        .await
        .unwrap();

    // No precalculate() ran for this period.
    let first = h.delivery.get_result(&period).await.unwrap();
    assert!(!first.precalculated);
    assert_eq!(first.combination.sum_parity(), Parity::Odd);

    // The on-demand result was persisted; later callers converge on it.
    let second = h.delivery.get_result(&period).await.unwrap();
    assert!(second.precalculated);
    assert_eq!(first.combination, second.combination);
    assert_eq!(h.sink.calls(), 1);
}

#[tokio::test]
async fn test_settlement_releases_ledger() {
    let h = harness().await;
    let period = period("20260804000104");

    h.ledger
        .record_bet(
            &period,
            &[Pattern::ExactSum(30)],
            Liability::new(50).unwrap(),
        )
        .await
        .unwrap();

    h.scheduler.precalculate(&period).await.unwrap();
    h.delivery.get_result(&period).await.unwrap();

    assert!(h.ledger.snapshot(&period).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_precalculated_record_carries_snapshot() {
    let h = harness().await;
    let period = period("20260804000105");

    h.ledger
        .record_bet(
            &period,
            &[Pattern::SumParity(Parity::Odd)],
            Liability::new(75).unwrap(),
        )
        .await
        .unwrap();

    let record = h.scheduler.precalculate(&period).await.unwrap();
    assert_eq!(record.snapshot, serde_json::json!({"sum:parity:odd": 75}));

    let stored = h.store.get(&period).await.unwrap().unwrap();
    assert_eq!(stored.snapshot, record.snapshot);
}
