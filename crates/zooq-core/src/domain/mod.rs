//! Domain model (worker ids, priorities, signatures, tasks).

pub mod ids;
pub mod priority;
pub mod signature;
pub mod state;
pub mod task;

pub use ids::{UNCLAIMED, WorkerId};
pub use priority::Priority;
pub use signature::{SIGNATURE_SEPARATOR, TaskSignature};
pub use state::TaskState;
pub use task::Task;
