//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **CommandExecutor**: 外部コマンドを起動する TaskExecutor
//!
//! TaskStore の実装は `queue` モジュール（`SqliteStore`, `InMemoryStore`）。

pub mod command;

pub use self::command::{CommandExecutor, CommandSpec};
