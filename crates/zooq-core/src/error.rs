use thiserror::Error;

use crate::domain::TaskSignature;

#[derive(Debug, Error)]
pub enum ZooqError {
    /// The backing medium could not be opened, or a statement failed mid-operation.
    /// Mutations that fail with this error have been rolled back.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed {what}: {value:?}")]
    Format { what: &'static str, value: String },

    #[error("executor not found for task_name={0}")]
    ExecutorNotFound(String),

    #[error("duplicate executor for task_name={0}")]
    DuplicateExecutor(String),

    #[error("task {task} failed: {message}")]
    Execution {
        task: TaskSignature,
        message: String,
    },
}

impl ZooqError {
    pub fn format(what: &'static str, value: impl Into<String>) -> Self {
        Self::Format {
            what,
            value: value.into(),
        }
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, ZooqError::Storage(_))
    }
}
