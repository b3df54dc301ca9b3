//! Dependency readiness.
//!
//! Satisfaction is defined negatively: a dependency is satisfied when no row
//! for its signature exists anywhere in the store (pending or active).
//!
//! Invariant: callers must compute `live` and `pending` from the same
//! snapshot, inside the transaction that will delete the selected task.

use std::collections::HashSet;

use crate::domain::{Task, TaskSignature};

/// Signatures of every logical task present in the store.
pub fn live_signatures<'a, I>(tasks: I) -> HashSet<TaskSignature>
where
    I: IntoIterator<Item = &'a Task>,
{
    tasks.into_iter().map(Task::signature).collect()
}

/// Is `task` ready given the live signature set?
pub fn is_ready(live: &HashSet<TaskSignature>, task: &Task) -> bool {
    task.dependson.iter().all(|dep| !live.contains(dep))
}

/// Pick the next ready task.
///
/// `pending` must be ordered by ascending position. The scan runs from the
/// most recently inserted task backwards and returns the index of the first
/// ready one. Priority is not consulted.
pub fn select_ready(live: &HashSet<TaskSignature>, pending: &[Task]) -> Option<usize> {
    pending.iter().rposition(|task| is_ready(live, task))
}

/// Dependencies currently holding `task` back, in declaration order.
pub fn explain_blocked(live: &HashSet<TaskSignature>, task: &Task) -> Vec<TaskSignature> {
    let mut seen = HashSet::new();
    task.dependson
        .iter()
        .filter(|dep| live.contains(*dep) && seen.insert(*dep))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Priority;

    fn task(name: &str, obj: &str) -> Task {
        Task::new(name, obj, Priority::Low)
    }

    #[test]
    fn task_without_dependencies_is_ready() {
        let live = live_signatures(&[task("a", "1")]);
        assert!(is_ready(&live, &task("b", "1")));
    }

    #[test]
    fn task_with_live_dependency_is_blocked() {
        let a = task("a", "1");
        let b = task("b", "1").after("a");
        let live = live_signatures([&a, &b]);

        assert!(!is_ready(&live, &b));
        assert_eq!(explain_blocked(&live, &b), vec![a.signature()]);
    }

    #[test]
    fn dependency_never_enqueued_counts_as_satisfied() {
        let b = task("b", "1").after("ghost");
        let live = live_signatures([&b]);
        assert!(is_ready(&live, &b));
    }

    #[test]
    fn self_dependency_never_becomes_ready() {
        let a = task("a", "1").after("a");
        let live = live_signatures([&a]);
        assert_eq!(select_ready(&live, std::slice::from_ref(&a)), None);
    }

    #[test]
    fn scan_prefers_most_recently_inserted_ready_task() {
        let c = task("c", "1");
        let d = task("d", "1");
        let pending = vec![c.clone(), d.clone()];
        let live = live_signatures(&pending);

        assert_eq!(select_ready(&live, &pending), Some(1));
    }

    #[test]
    fn scan_skips_blocked_tail() {
        let a = task("a", "1");
        let b = task("b", "1").after("a");
        let pending = vec![a.clone(), b.clone()];
        let live = live_signatures(&pending);

        assert_eq!(select_ready(&live, &pending), Some(0));
    }

    #[test]
    fn priority_does_not_change_selection() {
        let high = Task::new("h", "1", Priority::High);
        let low = Task::new("l", "1", Priority::Low);
        let pending = vec![high, low];
        let live = live_signatures(&pending);

        assert_eq!(select_ready(&live, &pending), Some(1));
    }
}
