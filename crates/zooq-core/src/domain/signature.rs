//! Dependency signatures.
//!
//! A signature is `task_name + "-" + task_obj`. It is stored verbatim in the
//! `depends_on` column and compared by exact string equality, so the format
//! must stay stable across releases.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

pub const SIGNATURE_SEPARATOR: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskSignature(String);

impl TaskSignature {
    /// Signature of the task identified by `(task_name, task_obj)`.
    pub fn of(task_name: &str, task_obj: &str) -> Self {
        Self(format!("{task_name}{SIGNATURE_SEPARATOR}{task_obj}"))
    }

    /// Wrap an already-formed signature (e.g. a persisted `depends_on` value).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TaskSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Borrow<str> for TaskSignature {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskSignature {
    fn from(raw: &str) -> Self {
        Self::from_raw(raw)
    }
}

impl From<String> for TaskSignature {
    fn from(raw: String) -> Self {
        Self::from_raw(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_joins_name_and_object_with_dash() {
        let sig = TaskSignature::of("unpack", "a1b2c3");
        assert_eq!(sig.as_str(), "unpack-a1b2c3");
    }

    #[test]
    fn raw_signature_is_kept_verbatim() {
        let sig = TaskSignature::from_raw("capa-1-2");
        assert_eq!(sig, TaskSignature::of("capa", "1-2"));
        assert_eq!(sig.to_string(), "capa-1-2");
    }
}
