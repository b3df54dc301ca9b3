//! Status - キューの状態スナップショット
//!
//! 各カウンタは独立した読み取りなので、書き込みと並行して取得した場合は
//! `is_conserved()` が false になり得る。

use serde::{Deserialize, Serialize};

use crate::error::ZooqError;
use crate::ports::TaskStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Distinct logical tasks (qsize).
    pub total: usize,
    pub pending: usize,
    pub active: usize,
}

impl QueueStatus {
    pub fn collect<S: TaskStore + ?Sized>(store: &S) -> Result<Self, ZooqError> {
        Ok(Self {
            total: store.qsize()?,
            pending: store.wait_size()?,
            active: store.active_len()?,
        })
    }

    /// `qsize == waitsize + active` (holds in any quiescent state).
    pub fn is_conserved(&self) -> bool {
        self.total == self.pending + self.active
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}
