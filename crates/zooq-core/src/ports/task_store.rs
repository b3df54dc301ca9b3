//! TaskStore port - キューの正本（source of truth）
//!
//! TaskStore は以下を管理します：
//! - pending / active タスクの行（fan-out 表現）
//! - 依存関係の ready 判定（pop_next / claim）
//! - open 時の recovery sweep
//!
//! # 実装
//! - `SqliteStore`: 本番用（ファイル）
//! - `InMemoryStore`: テスト用

use crate::domain::{Task, WorkerId};
use crate::error::ZooqError;
use crate::queue::QueueRow;

/// TaskStore は enqueue / pop / claim / reclaim / inspect の能力セット
///
/// # 設計原則
/// - 1 つの論理タスクに対する複数行の変更は全て同一トランザクション内
///   （fan-out の途中状態は観測されない）
/// - 読み取りはそれぞれ独立したスナップショット（呼び出し間の分離は保証しない）
/// - 書き込みは単一の scheduler を前提とする（内部で書き込み競合を調停しない）
pub trait TaskStore: Send {
    /// Insert one row per dependency (or one row if none), unowned.
    fn enqueue(&mut self, task: &Task) -> Result<(), ZooqError>;

    /// True if any row exists for the identity, pending or active.
    fn in_queue(&self, task_name: &str, task_obj: &str) -> Result<bool, ZooqError>;

    /// Distinct logical tasks, pending + active.
    fn qsize(&self) -> Result<usize, ZooqError>;

    /// Distinct pending logical tasks.
    fn wait_size(&self) -> Result<usize, ZooqError>;

    fn active_len(&self) -> Result<usize, ZooqError>;

    fn pending_len(&self) -> Result<usize, ZooqError>;

    fn get_active(&self) -> Result<Vec<Task>, ZooqError>;

    fn get_pending(&self) -> Result<Vec<Task>, ZooqError>;

    /// Active tasks followed by pending tasks.
    fn get_all(&self) -> Result<Vec<Task>, ZooqError> {
        let mut all = self.get_active()?;
        all.extend(self.get_pending()?);
        Ok(all)
    }

    /// Raw rows in ascending position order (inspection and tests).
    fn rows(&self) -> Result<Vec<QueueRow>, ZooqError>;

    /// Remove and return the next ready pending task, if any.
    ///
    /// Every row of the task's identity is deleted, including rows of an
    /// active duplicate. They are gone until `active_next` re-inserts them;
    /// in that window dependents of the task look ready. Use [`claim`] when
    /// more than one caller drives the store.
    ///
    /// [`claim`]: TaskStore::claim
    fn pop_next(&mut self) -> Result<Option<Task>, ZooqError>;

    /// Persist `task` as active under `task.owner`. An unclaimed task is a
    /// `Format` error.
    fn active_next(&mut self, task: &Task) -> Result<(), ZooqError>;

    /// Pop the next ready task and persist it as owned by `owner`, in one
    /// atomic step. Returns the task with its owner set.
    fn claim(&mut self, owner: WorkerId) -> Result<Option<Task>, ZooqError>;

    /// Delete every row owned by `owner`. `false` means nothing was owned,
    /// which is a normal outcome for a late or duplicate completion signal.
    fn reclaim(&mut self, owner: WorkerId) -> Result<bool, ZooqError>;
}
