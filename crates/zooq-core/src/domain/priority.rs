//! Task priority.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ZooqError;

/// Priority tag carried by every task.
///
/// Persisted as an integer (`0` = high, `1` = low). The readiness scan does
/// not consult it; selection order is insertion order only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Low,
}

impl Priority {
    pub fn as_db(self) -> i64 {
        match self {
            Priority::High => 0,
            Priority::Low => 1,
        }
    }

    pub fn from_db(value: i64) -> Result<Self, ZooqError> {
        match value {
            0 => Ok(Priority::High),
            1 => Ok(Priority::Low),
            other => Err(ZooqError::format("priority", other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ZooqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "low" => Ok(Priority::Low),
            _ => Err(ZooqError::format("priority", s)),
        }
    }
}
