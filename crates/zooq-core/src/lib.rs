//! zooq-core
//!
//! Durable task queue with priority tagging and dependency gating.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（WorkerId, Priority, TaskSignature, Task, TaskState）
//! - **ports**: 抽象化レイヤー（TaskStore, TaskExecutor）
//! - **queue**: 行表現、ready 判定、store 実装（SqliteStore, InMemoryStore）
//! - **app**: アプリケーションロジック（ExecutorRegistry, Scheduler, QueueStatus）
//! - **impls**: Executor 実装（CommandExecutor）
//! - **error**: エラー型

pub mod app;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;
pub mod queue;

pub use error::ZooqError;
