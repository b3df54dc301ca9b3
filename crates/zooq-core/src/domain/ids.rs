//! Worker identifiers.
//!
//! `WorkerId` is the value persisted in the `owner` column. A task whose rows
//! carry no owner is "unclaimed"; in the exchange format that state is the
//! literal string `"unclaimed"` rather than `null`, see [`owner_format`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ZooqError;

/// Identifier of the worker that claimed a task.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(i64);

impl WorkerId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn get(self) -> i64 {
        self.0
    }

    /// The id following this one (used by the scheduler's allocator).
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl From<i64> for WorkerId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for WorkerId {
    type Err = ZooqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(WorkerId)
            .map_err(|_| ZooqError::format("worker id", s))
    }
}

/// Literal used for an unclaimed owner in the exchange format.
pub const UNCLAIMED: &str = "unclaimed";

/// serde adapter for `Option<WorkerId>`: an integer, or `"unclaimed"`.
pub mod owner_format {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    use super::{UNCLAIMED, WorkerId};

    pub fn serialize<S: Serializer>(owner: &Option<WorkerId>, s: S) -> Result<S::Ok, S::Error> {
        match owner {
            Some(id) => s.serialize_i64(id.get()),
            None => s.serialize_str(UNCLAIMED),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<WorkerId>, D::Error> {
        d.deserialize_any(OwnerVisitor)
    }

    struct OwnerVisitor;

    impl<'de> Visitor<'de> for OwnerVisitor {
        type Value = Option<WorkerId>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "an integer worker id or \"{UNCLAIMED}\"")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(WorkerId::new(v)))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            i64::try_from(v)
                .map(|v| Some(WorkerId::new(v)))
                .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            if v == UNCLAIMED {
                Ok(None)
            } else {
                Err(E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "owner_format")]
        owner: Option<WorkerId>,
    }

    #[test]
    fn owner_serializes_as_integer_or_unclaimed() {
        let claimed = serde_json::to_value(Holder { owner: Some(WorkerId::new(7)) }).unwrap();
        assert_eq!(claimed, serde_json::json!({ "owner": 7 }));

        let free = serde_json::to_value(Holder { owner: None }).unwrap();
        assert_eq!(free, serde_json::json!({ "owner": "unclaimed" }));
    }

    #[test]
    fn owner_accepts_null_and_rejects_other_strings() {
        let h: Holder = serde_json::from_str(r#"{"owner": null}"#).unwrap();
        assert_eq!(h.owner, None);

        let err = serde_json::from_str::<Holder>(r#"{"owner": "someone"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn worker_id_parses_from_cli_text() {
        assert_eq!(" 42 ".parse::<WorkerId>().unwrap(), WorkerId::new(42));
        assert!("abc".parse::<WorkerId>().is_err());
    }
}
