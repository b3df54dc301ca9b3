//! App - アプリケーション層
//!
//! このモジュールは ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **ExecutorRegistry**: task_name → Executor の対応表
//! - **Scheduler**: claim → execute → reclaim のループ
//! - **QueueStatus**: キューのカウンタのスナップショット

pub mod registry;
pub mod scheduler;
pub mod status;

// 主要な型を再エクスポート
pub use self::registry::ExecutorRegistry;
pub use self::scheduler::{Scheduler, SchedulerOptions, SchedulerReport};
pub use self::status::QueueStatus;
