//! Persisted rows and the fan-out / regroup conversions.

use std::collections::HashMap;

use crate::domain::{Priority, Task, TaskSignature, WorkerId};

/// One persisted row of the `zooq` table.
///
/// A task with k > 0 dependencies is stored as k rows that differ only in
/// `depends_on` (and `position`); a task with none is a single row with
/// `depends_on = None`. All rows of a task share the same `owner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRow {
    /// Auto-increment insertion key; the sole ordering key.
    pub position: i64,
    pub task_name: String,
    pub priority: Priority,
    pub depends_on: Option<TaskSignature>,
    pub owner: Option<WorkerId>,
    pub task_obj: String,
}

/// A row about to be inserted (no position yet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDraft {
    pub task_name: String,
    pub priority: Priority,
    pub depends_on: Option<TaskSignature>,
    pub owner: Option<WorkerId>,
    pub task_obj: String,
}

impl RowDraft {
    pub fn into_row(self, position: i64) -> QueueRow {
        QueueRow {
            position,
            task_name: self.task_name,
            priority: self.priority,
            depends_on: self.depends_on,
            owner: self.owner,
            task_obj: self.task_obj,
        }
    }
}

impl QueueRow {
    pub fn is_identity(&self, task_name: &str, task_obj: &str) -> bool {
        self.task_name == task_name && self.task_obj == task_obj
    }
}

/// Expand a task into its rows, stamped with `owner`.
pub fn fan_out(task: &Task, owner: Option<WorkerId>) -> Vec<RowDraft> {
    let draft = |depends_on: Option<TaskSignature>| RowDraft {
        task_name: task.task_name.clone(),
        priority: task.priority,
        depends_on,
        owner,
        task_obj: task.task_obj.clone(),
    };

    if task.dependson.is_empty() {
        vec![draft(None)]
    } else {
        task.dependson.iter().cloned().map(|d| draft(Some(d))).collect()
    }
}

/// Rebuild logical tasks from rows ordered by ascending position.
///
/// Rows are grouped on `(task_name, task_obj)`; each row's `depends_on` is
/// appended to its group's `dependson`. Groups are emitted in first-seen
/// order. Priority and owner come from the first row of each group.
pub fn group_rows<'a, I>(rows: I) -> Vec<Task>
where
    I: IntoIterator<Item = &'a QueueRow>,
{
    let mut tasks: Vec<Task> = Vec::new();
    let mut index: HashMap<(&'a str, &'a str), usize> = HashMap::new();

    for row in rows {
        let key = (row.task_name.as_str(), row.task_obj.as_str());
        let slot = *index.entry(key).or_insert_with(|| {
            tasks.push(Task {
                task_name: row.task_name.clone(),
                task_obj: row.task_obj.clone(),
                priority: row.priority,
                dependson: Vec::new(),
                owner: row.owner,
            });
            tasks.len() - 1
        });

        if let Some(dep) = &row.depends_on {
            tasks[slot].dependson.push(dep.clone());
        }
    }

    tasks
}
