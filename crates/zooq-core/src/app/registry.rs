use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::Task;
use crate::error::ZooqError;
use crate::ports::TaskExecutor;

/// Registry of executors (task_name -> executor).
///
/// Design:
/// - Built during initialization (mutable).
/// - Shared read-only by the scheduler once running.
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn TaskExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    /// Register an executor for a task name.
    pub fn register(
        &mut self,
        task_name: impl Into<String>,
        executor: Arc<dyn TaskExecutor>,
    ) -> Result<(), ZooqError> {
        let task_name = task_name.into();
        if self.executors.contains_key(&task_name) {
            return Err(ZooqError::DuplicateExecutor(task_name));
        }
        self.executors.insert(task_name, executor);
        Ok(())
    }

    pub fn get(&self, task_name: &str) -> Option<&Arc<dyn TaskExecutor>> {
        self.executors.get(task_name)
    }

    pub fn task_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.executors.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }

    /// Run `task` with the executor registered for its name.
    pub async fn execute(&self, task: &Task) -> Result<(), ZooqError> {
        let executor = self
            .executors
            .get(&task.task_name)
            .ok_or_else(|| ZooqError::ExecutorNotFound(task.task_name.clone()))?;

        executor.execute(task).await
    }
}
