//! Ports - 抽象化レイヤー
//!
//! 各 trait は外部要素（永続化エンジン、タスク実行プロセス）への
//! インターフェースを提供し、実装の詳細を隠蔽します。

pub mod executor;
pub mod task_store;

pub use self::executor::TaskExecutor;
pub use self::task_store::TaskStore;
