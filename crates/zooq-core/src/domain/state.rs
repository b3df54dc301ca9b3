//! State - タスクの状態
//!
//! 状態は行の `owner` 列から導出される（専用の列は持たない）。

use serde::{Deserialize, Serialize};

use super::WorkerId;

/// TaskState は論理タスクの状態を表現
///
/// # 状態遷移
/// - enqueue → Pending
/// - pop_next → (store から一時的に消える)
/// - active_next / claim → Active
/// - reclaim → (完全に削除)
/// - open 時の recovery sweep: Active → Pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// owner が NULL（どの worker にも claim されていない）
    Pending,
    /// owner が設定済み（worker が実行中）
    Active,
}

impl TaskState {
    pub fn from_owner(owner: Option<WorkerId>) -> Self {
        match owner {
            Some(_) => TaskState::Active,
            None => TaskState::Pending,
        }
    }
}
