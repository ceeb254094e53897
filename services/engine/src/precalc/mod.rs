//! Pre-calculation scheduling
//!
//! Timer-driven state machine per active period:
//! idle -> triggered -> computing -> completed -> delivered -> expired.
//! The trigger fires at the freeze instant (a fixed offset before period
//! close); a per-period lock keeps concurrent scheduler instances from
//! computing the same period twice. Any failure during computation leaves
//! the period without a stored result and delivery falls back to
//! on-demand selection.

pub mod lock;

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::time::interval;

use shared::{GameKind, PeriodKey};

use crate::config::PrecalcConfig;
use crate::delivery::ResultDelivery;
use crate::errors::{EngineError, Result};
use crate::ledger::ExposureLedger;
use crate::period::{current_window, PeriodWindow};
use crate::selector::OptimalSelector;
use crate::store::{PreCalculatedResult, ResultStore};

use lock::PeriodLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecalcState {
    Idle,
    Triggered,
    Computing,
    Completed,
    Delivered,
    Expired,
}

impl PrecalcState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrecalcState::Idle => "idle",
            PrecalcState::Triggered => "triggered",
            PrecalcState::Computing => "computing",
            PrecalcState::Completed => "completed",
            PrecalcState::Delivered => "delivered",
            PrecalcState::Expired => "expired",
        }
    }
}

struct PeriodTracker {
    state: PrecalcState,
    end: DateTime<Utc>,
}

pub struct PreCalcScheduler {
    ledger: Arc<dyn ExposureLedger>,
    lock: Arc<dyn PeriodLock>,
    store: Arc<dyn ResultStore>,
    selector: Arc<OptimalSelector>,
    delivery: Arc<ResultDelivery>,
    config: PrecalcConfig,
    trackers: Mutex<HashMap<PeriodKey, PeriodTracker>>,
}

impl PreCalcScheduler {
    pub fn new(
        ledger: Arc<dyn ExposureLedger>,
        lock: Arc<dyn PeriodLock>,
        store: Arc<dyn ResultStore>,
        selector: Arc<OptimalSelector>,
        delivery: Arc<ResultDelivery>,
        config: PrecalcConfig,
    ) -> Self {
        Self {
            ledger,
            lock,
            store,
            selector,
            delivery,
            config,
            trackers: Mutex::new(HashMap::new()),
        }
    }

    /// Main scheduler loop: derive the active window per duration, trigger
    /// pre-calculation at freeze, deliver at period end.
    pub async fn run(self: Arc<Self>) {
        tracing::info!(
            durations = ?self.config.durations_secs,
            freeze_offset_secs = self.config.freeze_offset_secs,
            tick_interval_ms = self.config.tick_interval_ms,
            "Pre-calculation scheduler starting"
        );

        let mut ticker = interval(std::time::Duration::from_millis(
            self.config.tick_interval_ms,
        ));

        loop {
            ticker.tick().await;
            let now = Utc::now();

            for &duration_secs in &self.config.durations_secs {
                match current_window(GameKind::FiveD, duration_secs, &self.config.timeline, now) {
                    Ok(window) => {
                        if let Some(period) = self.due_trigger(&window, now) {
                            let scheduler = self.clone();
                            tokio::spawn(async move {
                                match scheduler.precalculate(&period).await {
                                    Ok(_) => {}
                                    Err(EngineError::DuplicateComputation(_)) => {
                                        tracing::debug!(
                                            period = %period,
                                            "Pre-calculation owned by another worker"
                                        );
                                    }
                                    Err(e) => {
                                        tracing::error!(
                                            period = %period,
                                            error = %e,
                                            "Pre-calculation failed"
                                        );
                                    }
                                }
                            });
                        }
                    }
                    Err(e) => {
                        tracing::error!(duration_secs, error = %e, "Invalid period duration")
                    }
                }
            }

            for period in self.due_deliveries(now) {
                let scheduler = self.clone();
                tokio::spawn(async move { scheduler.deliver(&period).await });
            }

            self.sweep_expired(now);
        }
    }

    /// Claim the trigger for a window that has reached its freeze instant.
    fn due_trigger(&self, window: &PeriodWindow, now: DateTime<Utc>) -> Option<PeriodKey> {
        let freeze_at = window.end - Duration::seconds(self.config.freeze_offset_secs as i64);

        let mut trackers = self.trackers.lock().expect("tracker mutex poisoned");
        let tracker = trackers.entry(window.key.clone()).or_insert(PeriodTracker {
            state: PrecalcState::Idle,
            end: window.end,
        });
        if tracker.state == PrecalcState::Idle && now >= freeze_at {
            tracker.state = PrecalcState::Triggered;
            Some(window.key.clone())
        } else {
            None
        }
    }

    /// Claim every tracked period whose window has closed for delivery.
    fn due_deliveries(&self, now: DateTime<Utc>) -> Vec<PeriodKey> {
        let mut trackers = self.trackers.lock().expect("tracker mutex poisoned");
        trackers
            .iter_mut()
            .filter(|(_, tracker)| {
                now >= tracker.end
                    && !matches!(
                        tracker.state,
                        PrecalcState::Delivered | PrecalcState::Expired
                    )
            })
            .map(|(period, tracker)| {
                tracker.state = PrecalcState::Delivered;
                period.clone()
            })
            .collect()
    }

    async fn deliver(&self, period: &PeriodKey) {
        match self.delivery.get_result(period).await {
            Ok(delivered) => {
                tracing::info!(
                    period = %period,
                    combination = %delivered.combination.key(),
                    mode = delivered.mode.as_str(),
                    precalculated = delivered.precalculated,
                    "Period result delivered"
                );
            }
            Err(e) => {
                tracing::error!(period = %period, error = %e, "Delivery failed, will retry");
                // Re-arm so the next tick retries.
                self.transition(period, PrecalcState::Completed);
            }
        }
    }

    /// Drop trackers whose retention window has passed.
    fn sweep_expired(&self, now: DateTime<Utc>) {
        let retention = Duration::seconds(self.config.result_ttl_secs as i64);
        let mut trackers = self.trackers.lock().expect("tracker mutex poisoned");
        trackers.retain(|period, tracker| {
            if now > tracker.end + retention {
                let prior = tracker.state;
                tracker.state = PrecalcState::Expired;
                tracing::debug!(
                    period = %period,
                    from = prior.as_str(),
                    "Period tracker expired"
                );
                false
            } else {
                true
            }
        });
    }

    /// Compute and persist the result for one period.
    ///
    /// Returns [`EngineError::DuplicateComputation`] when another worker
    /// holds the period lock; that is expected under multi-instance
    /// deployment and not an operational fault.
    pub async fn precalculate(&self, period: &PeriodKey) -> Result<PreCalculatedResult> {
        self.transition(period, PrecalcState::Triggered);

        let Some(token) = self.lock.acquire(period).await? else {
            self.transition(period, PrecalcState::Idle);
            metrics::counter!("precalc_lock_contended_total").increment(1);
            return Err(EngineError::DuplicateComputation(period.to_string()));
        };

        self.transition(period, PrecalcState::Computing);
        let computed = self.compute(period).await;

        if let Err(e) = self.lock.release(period, &token).await {
            tracing::warn!(period = %period, error = %e, "Failed to release computation lock");
        }

        match computed {
            Ok(record) => {
                self.transition(period, PrecalcState::Completed);
                metrics::counter!("precalc_completed_total").increment(1);
                tracing::info!(
                    period = %period,
                    combination = %record.combination.key(),
                    mode = record.mode.as_str(),
                    min_liability = record.min_liability.as_minor(),
                    "Pre-calculated result stored"
                );
                Ok(record)
            }
            Err(e) => {
                self.transition(period, PrecalcState::Idle);
                metrics::counter!("precalc_failed_total").increment(1);
                Err(e)
            }
        }
    }

    async fn compute(&self, period: &PeriodKey) -> Result<PreCalculatedResult> {
        let snapshot = self.ledger.snapshot(period).await?;
        let outcome = self.selector.select(&snapshot).await;

        let record = PreCalculatedResult {
            combination: outcome.combination,
            mode: outcome.mode,
            min_liability: outcome.min_liability,
            snapshot: snapshot.to_json(),
            computed_at_ms: Utc::now().timestamp_millis(),
        };

        self.store.put_if_absent(period, &record).await
    }

    /// Current state of a period, for observability.
    pub fn state_of(&self, period: &PeriodKey) -> Option<PrecalcState> {
        let trackers = self.trackers.lock().expect("tracker mutex poisoned");
        trackers.get(period).map(|tracker| tracker.state)
    }

    fn transition(&self, period: &PeriodKey, state: PrecalcState) {
        let mut trackers = self.trackers.lock().expect("tracker mutex poisoned");
        let tracker = trackers.entry(period.clone()).or_insert(PeriodTracker {
            state: PrecalcState::Idle,
            end: Utc::now(),
        });
        if tracker.state != state {
            tracing::debug!(
                period = %period,
                from = tracker.state.as_str(),
                to = state.as_str(),
                "Pre-calculation state transition"
            );
            tracker.state = state;
        }
    }
}
