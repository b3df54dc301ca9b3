use serde::{Deserialize, Serialize};

use super::ids::{WorkerId, owner_format};
use super::{Priority, TaskSignature, TaskState};

/// One logical task: identity `(task_name, task_obj)` plus its priority,
/// declared dependencies and owning worker.
///
/// This is also the exchange format handed to executors:
/// `{"task_name", "task_obj", "priority": "high"|"low", "dependson": [..], "owner": n|"unclaimed"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub task_name: String,
    pub task_obj: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub dependson: Vec<TaskSignature>,
    #[serde(with = "owner_format", default)]
    pub owner: Option<WorkerId>,
}

impl Task {
    /// An unclaimed task with no dependencies.
    pub fn new(task_name: impl Into<String>, task_obj: impl Into<String>, priority: Priority) -> Self {
        Self {
            task_name: task_name.into(),
            task_obj: task_obj.into(),
            priority,
            dependson: Vec::new(),
            owner: None,
        }
    }

    /// Add a dependency on another task's signature.
    pub fn depends_on(mut self, signature: impl Into<TaskSignature>) -> Self {
        self.dependson.push(signature.into());
        self
    }

    /// Add a dependency on `(task_name, self.task_obj)`.
    pub fn after(self, task_name: &str) -> Self {
        let sig = TaskSignature::of(task_name, &self.task_obj);
        self.depends_on(sig)
    }

    pub fn with_owner(mut self, owner: WorkerId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn signature(&self) -> TaskSignature {
        TaskSignature::of(&self.task_name, &self.task_obj)
    }

    pub fn identity(&self) -> (&str, &str) {
        (&self.task_name, &self.task_obj)
    }

    pub fn state(&self) -> TaskState {
        TaskState::from_owner(self.owner)
    }

    pub fn is_active(&self) -> bool {
        self.owner.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_format_roundtrips_through_json() {
        let task = Task::new("capa", "42", Priority::High)
            .after("unpack")
            .with_owner(WorkerId::new(3));

        let v = serde_json::to_value(&task).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "task_name": "capa",
                "task_obj": "42",
                "priority": "high",
                "dependson": ["unpack-42"],
                "owner": 3
            })
        );

        let back: Task = serde_json::from_value(v).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn missing_optional_fields_default_to_pending_low() {
        let json = r#"{ "task_name": "exif", "task_obj": "9" }"#;
        let task: Task = serde_json::from_str(json).expect("deserialize");
        assert_eq!(task.priority, Priority::Low);
        assert!(task.dependson.is_empty());
        assert_eq!(task.state(), TaskState::Pending);
        assert_eq!(task.signature().as_str(), "exif-9");
    }
}
