//! Chunked catalog scanning
//!
//! One scan worker walks a disjoint index shard of the catalog, tracking
//! the shard's minimum liability and the combinations achieving it. The
//! typed [`ChunkOutcome`] is the only message a worker sends back to the
//! coordinator.

use std::ops::Range;
use tokio_util::sync::CancellationToken;

use shared::Liability;

use crate::cache::CatalogView;
use crate::evaluator::evaluate;
use crate::ledger::ExposureSnapshot;

/// How many combinations a worker evaluates between cancellation checks.
const CANCEL_CHECK_STRIDE: u32 = 1_024;

/// Result of scanning one catalog shard.
#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    pub chunk_index: usize,
    /// Minimum liability seen in this shard.
    pub min_liability: Liability,
    /// Catalog indexes achieving the shard minimum. When the minimum is
    /// zero these are the shard's zero-exposure members.
    pub ties: Vec<u32>,
    /// Entries actually evaluated; less than the shard size when the scan
    /// was cancelled mid-shard.
    pub scanned: u32,
}

impl ChunkOutcome {
    pub fn is_partial(&self, shard_len: u32) -> bool {
        self.scanned < shard_len
    }
}

/// Evaluate every combination in `range`, stopping early when cancelled.
///
/// A cancelled worker still returns its partial outcome so the coordinator
/// can fall back to the best result found so far.
pub fn scan_chunk(
    view: &CatalogView,
    range: Range<u32>,
    snapshot: &ExposureSnapshot,
    cancel: &CancellationToken,
    chunk_index: usize,
) -> ChunkOutcome {
    let mut min_liability = Liability::from_total(i64::MAX);
    let mut ties: Vec<u32> = Vec::new();
    let mut scanned = 0u32;

    for index in range {
        if scanned % CANCEL_CHECK_STRIDE == 0 && cancel.is_cancelled() {
            break;
        }

        let Some(combination) = view.at(index) else {
            continue;
        };
        let liability = evaluate(&combination, snapshot);
        scanned += 1;

        if liability < min_liability {
            min_liability = liability;
            ties.clear();
            ties.push(index);
        } else if liability == min_liability {
            ties.push(index);
        }
    }

    ChunkOutcome {
        chunk_index,
        min_liability,
        ties,
        scanned,
    }
}

/// Split the catalog into `chunk_count` near-equal index shards.
pub fn shard_ranges(total: u32, chunk_count: usize) -> Vec<Range<u32>> {
    let chunk_count = chunk_count.max(1) as u32;
    let base = total / chunk_count;
    let remainder = total % chunk_count;

    let mut ranges = Vec::with_capacity(chunk_count as usize);
    let mut start = 0u32;
    for i in 0..chunk_count {
        let len = base + if i < remainder { 1 } else { 0 };
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}
