//! Status - ワーカーごとの実行件数

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// WorkerCounts はある時点のスナップショット
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerCounts {
    pub completed: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
pub(crate) struct WorkerCounters {
    completed: AtomicU64,
    failed: AtomicU64,
}

impl WorkerCounters {
    pub(crate) fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> WorkerCounts {
        WorkerCounts {
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
