//! Optimal-result selection
//!
//! Scans the full catalog for the combination(s) minimizing total
//! liability, fanning the scan out over blocking workers and merging their
//! typed chunk outcomes. Ties are broken uniformly at random so bettors
//! cannot infer the selection rule. The scan runs under a hard deadline;
//! an overrun falls back to the best partial result, or a random
//! combination, and never blocks settlement.

mod scan;

pub use scan::{scan_chunk, shard_ranges, ChunkOutcome};

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use shared::{Combination, Liability};

use crate::cache::CatalogView;
use crate::config::ScanConfig;
use crate::errors::EngineError;
use crate::ledger::ExposureSnapshot;

/// How a selection protected the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionMode {
    /// A combination with exactly zero liability was available.
    ZeroExposure,
    /// No zero-liability combination existed; the minimum was chosen.
    MinimumExposure,
    /// The deadline expired with partial coverage; best partial chosen.
    FallbackPartial,
    /// No scan data was available in time; chosen uniformly at random.
    FallbackRandom,
}

impl ProtectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtectionMode::ZeroExposure => "zero_exposure",
            ProtectionMode::MinimumExposure => "minimum_exposure",
            ProtectionMode::FallbackPartial => "fallback_partial",
            ProtectionMode::FallbackRandom => "fallback_random",
        }
    }
}

/// The selector's decision for one period.
#[derive(Debug, Clone)]
pub struct SelectionOutcome {
    pub combination: Combination,
    pub mode: ProtectionMode,
    pub min_liability: Liability,
    /// Number of combinations tied at the minimum.
    pub tie_count: u32,
    /// Catalog entries actually evaluated.
    pub scanned: u32,
    pub elapsed_ms: u64,
}

pub struct OptimalSelector {
    view: CatalogView,
    chunk_count: usize,
    deadline: Duration,
}

impl OptimalSelector {
    pub fn new(view: CatalogView, scan: &ScanConfig) -> Self {
        Self {
            view,
            chunk_count: scan.chunk_count.max(1),
            deadline: Duration::from_millis(scan.deadline_ms),
        }
    }

    /// Choose the outcome for the given exposure snapshot.
    ///
    /// Never fails: deadline overruns and missing scan data degrade to
    /// fallback modes, reported through logging and metrics only.
    pub async fn select(&self, snapshot: &ExposureSnapshot) -> SelectionOutcome {
        let started = Instant::now();

        // No bets recorded: every combination carries zero exposure.
        if snapshot.is_empty() {
            return SelectionOutcome {
                combination: self.random_combination(),
                mode: ProtectionMode::ZeroExposure,
                min_liability: Liability::ZERO,
                tie_count: self.view.len(),
                scanned: 0,
                elapsed_ms: elapsed_ms(started),
            };
        }

        let (outcomes, deadline_hit) = self.run_scan(snapshot).await;
        let elapsed = elapsed_ms(started);
        metrics::histogram!("selection_scan_duration_ms").record(elapsed as f64);

        if deadline_hit {
            let err = EngineError::SelectionTimeout { elapsed_ms: elapsed };
            tracing::warn!(error = %err, chunks_reported = outcomes.len(), "Scan missed deadline, degrading");
            metrics::counter!("selection_fallback_total").increment(1);
        }

        let outcome = match merge_outcomes(&outcomes) {
            Some(merged) => {
                let combination = self
                    .pick_tie(&merged.ties)
                    .unwrap_or_else(|| self.random_combination());
                let mode = if deadline_hit {
                    ProtectionMode::FallbackPartial
                } else if merged.min_liability.is_zero() {
                    ProtectionMode::ZeroExposure
                } else {
                    ProtectionMode::MinimumExposure
                };
                SelectionOutcome {
                    combination,
                    mode,
                    min_liability: merged.min_liability,
                    tie_count: merged.ties.len() as u32,
                    scanned: merged.scanned,
                    elapsed_ms: elapsed,
                }
            }
            None => SelectionOutcome {
                combination: self.random_combination(),
                mode: ProtectionMode::FallbackRandom,
                min_liability: Liability::ZERO,
                tie_count: 0,
                scanned: 0,
                elapsed_ms: elapsed,
            },
        };

        tracing::info!(
            combination = %outcome.combination.key(),
            mode = outcome.mode.as_str(),
            min_liability = outcome.min_liability.as_minor(),
            tie_count = outcome.tie_count,
            scanned = outcome.scanned,
            elapsed_ms = outcome.elapsed_ms,
            "Selection completed"
        );
        outcome
    }

    /// Fan the scan out to blocking workers and gather their outcomes
    /// until every shard reports or the deadline expires.
    async fn run_scan(&self, snapshot: &ExposureSnapshot) -> (Vec<ChunkOutcome>, bool) {
        let snapshot = Arc::new(snapshot.clone());
        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel::<ChunkOutcome>(self.chunk_count);

        let mut handles = Vec::with_capacity(self.chunk_count);
        for (chunk_index, range) in shard_ranges(self.view.len(), self.chunk_count)
            .into_iter()
            .enumerate()
        {
            let view = self.view.clone();
            let snapshot = snapshot.clone();
            let cancel = cancel.clone();
            let tx = tx.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                let outcome = scan_chunk(&view, range, &snapshot, &cancel, chunk_index);
                let _ = tx.blocking_send(outcome);
            }));
        }
        drop(tx);

        let mut outcomes: Vec<ChunkOutcome> = Vec::with_capacity(self.chunk_count);
        let deadline_hit = tokio::time::timeout(self.deadline, async {
            while let Some(outcome) = rx.recv().await {
                outcomes.push(outcome);
            }
        })
        .await
        .is_err();

        if deadline_hit {
            // Abandon the in-flight scan; cancelled workers flush their
            // partial outcomes within one check stride.
            cancel.cancel();
            let _ = tokio::time::timeout(Duration::from_millis(100), async {
                while let Some(outcome) = rx.recv().await {
                    outcomes.push(outcome);
                }
            })
            .await;
        }

        let _ = futures::future::join_all(handles).await;

        (outcomes, deadline_hit)
    }

    fn pick_tie(&self, ties: &[u32]) -> Option<Combination> {
        if ties.is_empty() {
            return None;
        }
        let index = ties[rand::thread_rng().gen_range(0..ties.len())];
        self.view.at(index)
    }

    fn random_combination(&self) -> Combination {
        let mut rng = rand::thread_rng();
        loop {
            if let Some(combination) = self.view.at(rng.gen_range(0..self.view.len())) {
                return combination;
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

struct MergedOutcome {
    min_liability: Liability,
    ties: Vec<u32>,
    scanned: u32,
}

/// Merge chunk outcomes: global minimum, union of tie sets at that
/// minimum. Shards that evaluated nothing are ignored.
fn merge_outcomes(outcomes: &[ChunkOutcome]) -> Option<MergedOutcome> {
    let reported: Vec<&ChunkOutcome> = outcomes.iter().filter(|o| o.scanned > 0).collect();
    let min_liability = reported.iter().map(|o| o.min_liability).min()?;

    let mut ties = Vec::new();
    let mut scanned = 0u32;
    for outcome in &reported {
        scanned += outcome.scanned;
        if outcome.min_liability == min_liability {
            ties.extend_from_slice(&outcome.ties);
        }
    }

    Some(MergedOutcome {
        min_liability,
        ties,
        scanned,
    })
}
