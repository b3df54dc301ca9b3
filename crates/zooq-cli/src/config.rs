//! `Zooq.toml` loading and validation.
//!
//! ```toml
//! [queue]
//! database = "zooq.db"
//! poll_interval_ms = 500
//! max_workers = 2
//!
//! [task.capa]
//! cmd = "capa -j {obj}"
//! output = "out/{obj}.capa.json"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::debug;
use zooq_core::impls::CommandSpec;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub queue: QueueSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueSection {
    #[serde(default = "default_database")]
    pub database: PathBuf,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

fn default_database() -> PathBuf {
    PathBuf::from("zooq.db")
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_max_workers() -> usize {
    1
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            database: default_database(),
            poll_interval_ms: default_poll_interval_ms(),
            max_workers: default_max_workers(),
        }
    }
}

impl QueueSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// `[task.<name>]`: how to execute tasks of that name.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    pub cmd: String,

    #[serde(default)]
    pub output: Option<String>,

    #[serde(default)]
    pub workdir: Option<PathBuf>,
}

impl TaskConfig {
    pub fn to_spec(&self) -> CommandSpec {
        let mut spec = CommandSpec::new(self.cmd.clone());
        if let Some(output) = &self.output {
            spec = spec.with_output(output.clone());
        }
        if let Some(dir) = &self.workdir {
            spec = spec.with_workdir(dir.clone());
        }
        spec
    }
}

pub fn parse_str(contents: &str) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(contents).context("parsing TOML config")?;
    validate_config(&config)?;
    Ok(config)
}

/// Load and validate `path`.
///
/// When the file does not exist and `required` is false, defaults are used.
pub fn load(path: &Path, required: bool) -> Result<ConfigFile> {
    if !required && !path.exists() {
        debug!(path = %path.display(), "no config file; using defaults");
        return Ok(ConfigFile::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading config file at {:?}", path))?;
    parse_str(&contents).with_context(|| format!("loading config from {:?}", path))
}

pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    if cfg.queue.max_workers == 0 {
        return Err(anyhow!("[queue].max_workers must be >= 1 (got 0)"));
    }
    for (name, task) in &cfg.task {
        if task.cmd.trim().is_empty() {
            return Err(anyhow!("task '{}' has an empty `cmd`", name));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = parse_str("").unwrap();
        assert_eq!(cfg.queue.database, PathBuf::from("zooq.db"));
        assert_eq!(cfg.queue.poll_interval(), Duration::from_millis(500));
        assert_eq!(cfg.queue.max_workers, 1);
        assert!(cfg.task.is_empty());
    }

    #[test]
    fn tasks_become_command_specs() {
        let cfg = parse_str(
            r#"
            [queue]
            database = "/var/lib/zooq/q.db"
            max_workers = 4

            [task.capa]
            cmd = "capa -j {obj}"
            output = "out/{obj}.json"
            workdir = "/srv/samples"

            [task.exif]
            cmd = "exiftool {obj}"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.queue.max_workers, 4);
        assert_eq!(cfg.queue.poll_interval_ms, 500);
        let names: Vec<&str> = cfg.task.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["capa", "exif"]);

        let capa = cfg.task["capa"].to_spec();
        assert_eq!(capa.cmd, "capa -j {obj}");
        assert_eq!(capa.output.as_deref(), Some("out/{obj}.json"));
        assert_eq!(capa.workdir, Some(PathBuf::from("/srv/samples")));
        assert!(cfg.task["exif"].to_spec().output.is_none());
    }

    #[test]
    fn zero_workers_is_rejected() {
        let err = parse_str("[queue]\nmax_workers = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_workers"));
    }

    #[test]
    fn blank_cmd_is_rejected() {
        let err = parse_str("[task.capa]\ncmd = \"  \"\n").unwrap_err();
        assert!(err.to_string().contains("capa"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse_str("[queue]\nworkers = 3\n").is_err());
    }

    #[test]
    fn missing_optional_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Zooq.toml");

        assert!(load(&path, false).unwrap().task.is_empty());
        assert!(load(&path, true).is_err());

        fs::write(&path, "[task.a]\ncmd = \"true\"\n").unwrap();
        assert_eq!(load(&path, true).unwrap().task.len(), 1);
    }
}
