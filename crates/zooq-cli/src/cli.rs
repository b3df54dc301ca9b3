//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use zooq_core::domain::Priority;

/// Command-line arguments for `zooq`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "zooq",
    version,
    about = "Durable task queue with dependency gating.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// A missing file at the default location means "all defaults".
    #[arg(long, global = true, value_name = "PATH", default_value = "Zooq.toml")]
    pub config: PathBuf,

    /// Override `[queue].database` from the config file.
    #[arg(long, global = true, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ZOOQ_LOG` or `info` is used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Claim and execute ready tasks until interrupted.
    Run {
        /// Return as soon as nothing is running and nothing is ready.
        #[arg(long)]
        once: bool,
    },
    /// Add a task to the queue.
    Enqueue(EnqueueArgs),
    /// Print queue counters.
    Status {
        #[arg(long)]
        json: bool,
    },
    /// List queued tasks.
    List(ListArgs),
    /// Release everything owned by a worker id.
    Reclaim {
        owner: i64,
    },
}

#[derive(Debug, Clone, Args)]
pub struct EnqueueArgs {
    pub task_name: String,
    pub task_obj: String,

    #[arg(long, value_enum, default_value_t = PriorityArg::Low)]
    pub priority: PriorityArg,

    /// Depend on task NAME for the same object (repeatable).
    #[arg(long = "after", value_name = "NAME")]
    pub after: Vec<String>,

    /// Depend on a raw signature `name-obj` (repeatable).
    #[arg(long = "depends-on", value_name = "SIG")]
    pub depends_on: Vec<String>,

    /// Enqueue even if the same (name, obj) is already queued.
    #[arg(long)]
    pub allow_duplicate: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    #[arg(long, conflicts_with = "pending")]
    pub active: bool,

    #[arg(long)]
    pub pending: bool,

    /// Print the tasks as a JSON array.
    #[arg(long)]
    pub json: bool,
}

/// Log level as exposed on the CLI and in `ZOOQ_LOG`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    #[value(alias = "warning")]
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Case-insensitive parse with the same names clap accepts.
    pub fn parse_loose(s: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(s.trim(), true).ok()
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum PriorityArg {
    High,
    Low,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::High => Priority::High,
            PriorityArg::Low => Priority::Low,
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
