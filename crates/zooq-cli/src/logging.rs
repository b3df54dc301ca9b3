//! Tracing subscriber bootstrap.
//!
//! The level comes from `--log-level`, then `ZOOQ_LOG`, then `info`. Both
//! sources accept the names of [`LogLevel`]. Output goes to stderr so
//! `list --json` and `status --json` stay machine readable.

use anyhow::{Result, anyhow};
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "ZOOQ_LOG";

/// Pick the effective level. An unparsable env value falls back to the default.
pub fn resolve_level(cli_level: Option<LogLevel>, env_value: Option<&str>) -> LogLevel {
    cli_level
        .or_else(|| env_value.and_then(LogLevel::parse_loose))
        .unwrap_or_default()
}

pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_value = std::env::var(LOG_ENV).ok();
    let level = resolve_level(cli_level, env_value.as_deref());

    fmt()
        .with_max_level(tracing::Level::from(level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("installing log subscriber: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_beats_env_beats_default() {
        assert_eq!(resolve_level(Some(LogLevel::Trace), Some("error")), LogLevel::Trace);
        assert_eq!(resolve_level(None, Some("error")), LogLevel::Error);
        assert_eq!(resolve_level(None, Some("chatty")), LogLevel::Info);
        assert_eq!(resolve_level(None, None), LogLevel::Info);
    }
}
