use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    Pending,
    InProgress,
    Completed,
    /// Terminal like `Completed`, but some rows carry explicit missing
    /// enrichment after exhausted retries or no-coverage results
    CompletedWithMissing,
}

impl BatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::CompletedWithMissing)
    }
}

/// A contiguous slice of the input, processed and checkpointed as a unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub index: usize,
    pub rows: Range<usize>,
    pub status: BatchStatus,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Partition `total` rows into fixed-size batches; the last batch may be
/// shorter. Membership is a pure function of row order and batch size, so
/// re-running with the same inputs always yields identical boundaries.
pub fn partition(total: usize, batch_size: usize) -> Vec<Batch> {
    debug_assert!(batch_size > 0);

    (0..total)
        .step_by(batch_size.max(1))
        .enumerate()
        .map(|(index, start)| Batch {
            index,
            rows: start..(start + batch_size).min(total),
            status: BatchStatus::Pending,
        })
        .collect()
}
