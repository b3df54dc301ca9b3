//! TaskExecutor port - 外部ワーカーとの契約
//!
//! Executor は claim 済みの Task を受け取り、store の外側で副作用を起こす
//! （外部ツールの起動、結果ファイルの書き込みなど）。完了は scheduler が
//! `reclaim(owner)` を呼ぶことで間接的に通知される。

use async_trait::async_trait;

use crate::domain::Task;
use crate::error::ZooqError;

/// TaskExecutor は 1 つの task_name の処理を担当
///
/// # 契約
/// - `task.owner` は設定済み（claim 後にのみ呼ばれる）
/// - 外部副作用は冪等であること（出力ファイルは上書きで安全に再生成できる）
///   crash 後は同じ論理タスクが別の owner で再実行され得る
/// - store には触れない
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, task: &Task) -> Result<(), ZooqError>;
}
