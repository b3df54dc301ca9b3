//! Queue module: persisted rows, dependency readiness, and the store backends.

mod memory;
pub mod readiness;
mod row;
mod sqlite;

pub use memory::InMemoryStore;
pub use row::{QueueRow, RowDraft, fan_out, group_rows};
pub use sqlite::SqliteStore;
