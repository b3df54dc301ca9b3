//! In-memory store implementation.

use std::collections::HashSet;

use tracing::{debug, info};

use super::readiness::{live_signatures, select_ready};
use super::row::{QueueRow, fan_out, group_rows};
use crate::domain::{Priority, Task, UNCLAIMED, WorkerId};
use crate::error::ZooqError;
use crate::ports::TaskStore;

/// In-memory store.
///
/// Rows live in a `Vec` kept in ascending position order. Every mutation
/// completes without a fallible step, so fan-out is all-or-nothing.
#[derive(Debug)]
pub struct InMemoryStore {
    rows: Vec<QueueRow>,
    next_position: i64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            next_position: 1,
        }
    }

    /// Rebuild a store from previously persisted rows, then run the
    /// recovery sweep as `SqliteStore::open` does.
    pub fn from_rows(mut rows: Vec<QueueRow>) -> Self {
        rows.sort_by_key(|r| r.position);
        let next_position = rows.last().map(|r| r.position + 1).unwrap_or(1);
        let mut store = Self {
            rows,
            next_position,
        };
        store.recover();
        store
    }

    /// Demote every owned row to pending with low priority.
    fn recover(&mut self) -> usize {
        let mut demoted = 0;
        for row in self.rows.iter_mut().filter(|r| r.owner.is_some()) {
            row.owner = None;
            row.priority = Priority::Low;
            demoted += 1;
        }
        if demoted > 0 {
            info!(rows = demoted, "recovery sweep demoted orphaned claims");
        }
        demoted
    }

    fn insert_task(&mut self, task: &Task, owner: Option<WorkerId>) {
        for draft in fan_out(task, owner) {
            let position = self.next_position;
            self.next_position += 1;
            self.rows.push(draft.into_row(position));
        }
    }

    /// Drop every row of the identity, owned or not.
    fn remove_identity(&mut self, task_name: &str, task_obj: &str) -> usize {
        let before = self.rows.len();
        self.rows.retain(|r| !r.is_identity(task_name, task_obj));
        before - self.rows.len()
    }

    fn tasks_where(&self, active: bool) -> Vec<Task> {
        group_rows(self.rows.iter().filter(|r| r.owner.is_some() == active))
    }

    fn distinct(&self, filter: impl Fn(&QueueRow) -> bool) -> usize {
        self.rows
            .iter()
            .filter(|r| filter(*r))
            .map(|r| (r.task_name.as_str(), r.task_obj.as_str()))
            .collect::<HashSet<_>>()
            .len()
    }

    fn take_ready(&mut self) -> Option<Task> {
        let live = live_signatures(&group_rows(&self.rows));
        let pending = self.tasks_where(false);
        let idx = select_ready(&live, &pending)?;
        let task = pending.into_iter().nth(idx)?;
        let removed = self.remove_identity(&task.task_name, &task.task_obj);
        debug!(task = %task.signature(), rows = removed, "popped ready task");
        Some(task)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore for InMemoryStore {
    fn enqueue(&mut self, task: &Task) -> Result<(), ZooqError> {
        self.insert_task(task, None);
        debug!(task = %task.signature(), deps = task.dependson.len(), "enqueued");
        Ok(())
    }

    fn in_queue(&self, task_name: &str, task_obj: &str) -> Result<bool, ZooqError> {
        Ok(self.rows.iter().any(|r| r.is_identity(task_name, task_obj)))
    }

    fn qsize(&self) -> Result<usize, ZooqError> {
        Ok(self.distinct(|_| true))
    }

    fn wait_size(&self) -> Result<usize, ZooqError> {
        self.pending_len()
    }

    fn active_len(&self) -> Result<usize, ZooqError> {
        Ok(self.distinct(|r| r.owner.is_some()))
    }

    fn pending_len(&self) -> Result<usize, ZooqError> {
        Ok(self.distinct(|r| r.owner.is_none()))
    }

    fn get_active(&self) -> Result<Vec<Task>, ZooqError> {
        Ok(self.tasks_where(true))
    }

    fn get_pending(&self) -> Result<Vec<Task>, ZooqError> {
        Ok(self.tasks_where(false))
    }

    fn rows(&self) -> Result<Vec<QueueRow>, ZooqError> {
        Ok(self.rows.clone())
    }

    fn pop_next(&mut self) -> Result<Option<Task>, ZooqError> {
        Ok(self.take_ready())
    }

    fn active_next(&mut self, task: &Task) -> Result<(), ZooqError> {
        let owner = task.owner.ok_or_else(|| ZooqError::format("owner", UNCLAIMED))?;
        self.insert_task(task, Some(owner));
        debug!(task = %task.signature(), %owner, "marked active");
        Ok(())
    }

    fn claim(&mut self, owner: WorkerId) -> Result<Option<Task>, ZooqError> {
        let Some(task) = self.take_ready() else {
            return Ok(None);
        };
        let task = task.with_owner(owner);
        self.insert_task(&task, Some(owner));
        Ok(Some(task))
    }

    fn reclaim(&mut self, owner: WorkerId) -> Result<bool, ZooqError> {
        let before = self.rows.len();
        self.rows.retain(|r| r.owner != Some(owner));
        let removed = before - self.rows.len();
        debug!(%owner, rows = removed, "reclaimed");
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskSignature;

    fn active_row(position: i64, name: &str, priority: Priority, owner: i64) -> QueueRow {
        QueueRow {
            position,
            task_name: name.to_string(),
            priority,
            depends_on: None,
            owner: Some(WorkerId::new(owner)),
            task_obj: "1".to_string(),
        }
    }

    #[test]
    fn positions_increase_across_enqueue_and_claim() {
        let mut store = InMemoryStore::new();
        store.enqueue(&Task::new("a", "1", Priority::Low)).unwrap();
        store.enqueue(&Task::new("b", "1", Priority::Low).after("x").after("y")).unwrap();

        let positions: Vec<i64> = store.rows().unwrap().iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);

        // "b" is the most recent ready task; it is re-inserted at fresh positions
        let claimed = store.claim(WorkerId::new(1)).unwrap().unwrap();
        assert_eq!(claimed.task_name, "b");
        let owned: Vec<i64> = store
            .rows()
            .unwrap()
            .iter()
            .filter(|r| r.owner == Some(WorkerId::new(1)))
            .map(|r| r.position)
            .collect();
        assert_eq!(owned, vec![4, 5]);
    }

    #[test]
    fn from_rows_demotes_owned_rows_to_low_pending() {
        let store = InMemoryStore::from_rows(vec![
            active_row(3, "capa", Priority::High, 11),
            active_row(1, "exif", Priority::High, 12),
        ]);

        assert!(store.rows().unwrap().iter().all(|r| r.owner.is_none()));
        assert!(store.rows().unwrap().iter().all(|r| r.priority == Priority::Low));
        assert_eq!(store.active_len().unwrap(), 0);
        assert_eq!(store.pending_len().unwrap(), 2);
        assert_eq!(store.get_pending().unwrap()[0].task_name, "exif");
    }

    #[test]
    fn from_rows_continues_position_sequence() {
        let mut store = InMemoryStore::from_rows(vec![active_row(7, "capa", Priority::Low, 1)]);
        store.enqueue(&Task::new("next", "1", Priority::Low)).unwrap();
        assert_eq!(store.rows().unwrap().last().unwrap().position, 8);
    }

    #[test]
    fn pop_next_removes_all_fan_out_rows() {
        let mut store = InMemoryStore::new();
        let task = Task::new("report", "1", Priority::Low)
            .depends_on(TaskSignature::from_raw("gone-1"))
            .depends_on(TaskSignature::from_raw("gone-2"));
        store.enqueue(&task).unwrap();
        assert_eq!(store.rows().unwrap().len(), 2);

        let popped = store.pop_next().unwrap().unwrap();
        assert_eq!(popped, task);
        assert!(store.rows().unwrap().is_empty());
    }
}
