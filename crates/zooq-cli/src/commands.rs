//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{info, warn};
use zooq_core::app::{ExecutorRegistry, QueueStatus, Scheduler, SchedulerOptions};
use zooq_core::domain::{Task, TaskSignature, WorkerId};
use zooq_core::impls::CommandExecutor;
use zooq_core::ports::TaskStore;
use zooq_core::queue::SqliteStore;
use zooq_core::queue::readiness::{explain_blocked, live_signatures};

use crate::cli::{CliArgs, Command, EnqueueArgs, ListArgs};
use crate::config::{self, ConfigFile};

const DEFAULT_CONFIG: &str = "Zooq.toml";

pub async fn dispatch(args: CliArgs) -> Result<()> {
    let required = args.config != Path::new(DEFAULT_CONFIG);
    let cfg = config::load(&args.config, required)?;
    let database = args.database.clone().unwrap_or_else(|| cfg.queue.database.clone());

    match args.command {
        Command::Run { once } => run(&cfg, &database, once).await,
        Command::Enqueue(e) => enqueue(&database, e),
        Command::Status { json } => status(&database, json),
        Command::List(l) => list(&database, l),
        Command::Reclaim { owner } => reclaim(&database, owner),
    }
}

/// Opened by `run`: this process owns every claim, so stale ones are swept.
fn open_store(database: &Path) -> Result<SqliteStore> {
    SqliteStore::open(database)
        .with_context(|| format!("opening queue database at {:?}", database))
}

/// Opened by the other subcommands, which may run next to a live scheduler.
fn attach_store(database: &Path) -> Result<SqliteStore> {
    SqliteStore::attach(database)
        .with_context(|| format!("attaching to queue database at {:?}", database))
}

fn build_registry(cfg: &ConfigFile) -> Result<ExecutorRegistry> {
    let mut registry = ExecutorRegistry::new();
    for (name, task) in &cfg.task {
        registry
            .register(name.clone(), Arc::new(CommandExecutor::new(task.to_spec())))
            .with_context(|| format!("registering executor for task '{name}'"))?;
    }
    Ok(registry)
}

async fn run(cfg: &ConfigFile, database: &Path, once: bool) -> Result<()> {
    let registry = build_registry(cfg)?;
    if registry.is_empty() {
        warn!("no [task.<name>] sections configured; every claimed task will fail");
    } else {
        info!(tasks = ?registry.task_names(), "executors registered");
    }

    let store = open_store(database)?;
    let options = SchedulerOptions {
        poll_interval: cfg.queue.poll_interval(),
        max_workers: cfg.queue.max_workers,
        exit_when_idle: once,
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received; finishing running tasks");
                let _ = shutdown_tx.send(true);
            }
            Err(err) => {
                warn!(error = %err, "cannot listen for ctrl-c");
                // keep the sender alive so the scheduler does not read this as shutdown
                std::future::pending::<()>().await;
            }
        }
    });

    let mut scheduler = Scheduler::new(store, Arc::new(registry), options);
    let report = scheduler.run(shutdown_rx).await.context("scheduler failed")?;

    println!("completed: {}  failed: {}", report.completed, report.failed);
    Ok(())
}

fn build_task(e: &EnqueueArgs) -> Task {
    let mut task = Task::new(e.task_name.clone(), e.task_obj.clone(), e.priority.into());
    for name in &e.after {
        task = task.after(name);
    }
    for sig in &e.depends_on {
        task = task.depends_on(TaskSignature::from_raw(sig.clone()));
    }
    task
}

fn enqueue(database: &Path, e: EnqueueArgs) -> Result<()> {
    let mut store = attach_store(database)?;
    let task = build_task(&e);

    if !e.allow_duplicate && store.in_queue(&task.task_name, &task.task_obj)? {
        info!(task = %task.signature(), "already queued; skipping");
        println!("skipped {} (already queued)", task.signature());
        return Ok(());
    }

    store
        .enqueue(&task)
        .with_context(|| format!("enqueueing {}", task.signature()))?;
    println!("queued {}", task.signature());
    Ok(())
}

fn status(database: &Path, json: bool) -> Result<()> {
    let store = attach_store(database)?;
    let status = QueueStatus::collect(&store)?;
    if !status.is_conserved() {
        warn!(?status, "counters disagree; queue changed while reading");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!(
            "total: {}  pending: {}  active: {}",
            status.total, status.pending, status.active
        );
    }
    Ok(())
}

fn list(database: &Path, l: ListArgs) -> Result<()> {
    let store = attach_store(database)?;
    let all = store.get_all()?;
    let tasks: Vec<&Task> = all
        .iter()
        .filter(|t| (!l.active || t.is_active()) && (!l.pending || !t.is_active()))
        .collect();

    if l.json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    let live = live_signatures(&all);
    for task in tasks {
        println!("{}", describe(task, &explain_blocked(&live, task)));
    }
    Ok(())
}

fn describe(task: &Task, blocked_on: &[TaskSignature]) -> String {
    let state = match task.owner {
        Some(owner) => format!("active({owner})"),
        None if blocked_on.is_empty() => "ready".to_string(),
        None => "blocked".to_string(),
    };
    let mut line = format!("{:<10} {:<5} {}", state, task.priority, task.signature());
    if task.owner.is_none() && !blocked_on.is_empty() {
        let deps: Vec<&str> = blocked_on.iter().map(TaskSignature::as_str).collect();
        line.push_str(&format!("  <- {}", deps.join(", ")));
    }
    line
}

fn reclaim(database: &Path, owner: i64) -> Result<()> {
    let mut store = attach_store(database)?;
    let owner = WorkerId::new(owner);
    if store.reclaim(owner)? {
        println!("reclaimed tasks owned by {owner}");
    } else {
        println!("nothing owned by {owner}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::PriorityArg;
    use zooq_core::domain::Priority;

    fn enqueue_args(name: &str, obj: &str) -> EnqueueArgs {
        EnqueueArgs {
            task_name: name.into(),
            task_obj: obj.into(),
            priority: PriorityArg::Low,
            after: vec![],
            depends_on: vec![],
            allow_duplicate: false,
        }
    }

    #[test]
    fn build_task_mixes_after_and_raw_signatures() {
        let mut args = enqueue_args("report", "s1");
        args.priority = PriorityArg::High;
        args.after = vec!["capa".into()];
        args.depends_on = vec!["unpack-s0".into()];

        let task = build_task(&args);
        assert_eq!(task.priority, Priority::High);
        let deps: Vec<&str> = task.dependson.iter().map(TaskSignature::as_str).collect();
        assert_eq!(deps, vec!["capa-s1", "unpack-s0"]);
    }

    #[test]
    fn enqueue_skips_duplicates_unless_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("q.db");

        enqueue(&db, enqueue_args("a", "1")).unwrap();
        enqueue(&db, enqueue_args("a", "1")).unwrap();
        assert_eq!(attach_store(&db).unwrap().rows().unwrap().len(), 1);

        let mut dup = enqueue_args("a", "1");
        dup.allow_duplicate = true;
        enqueue(&db, dup).unwrap();
        assert_eq!(attach_store(&db).unwrap().rows().unwrap().len(), 2);
    }

    #[test]
    fn reclaim_releases_owner() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("q.db");
        let mut store = open_store(&db).unwrap();
        store.enqueue(&Task::new("a", "1", Priority::Low)).unwrap();
        store.claim(WorkerId::new(5)).unwrap().unwrap();

        reclaim(&db, 5).unwrap();
        assert_eq!(store.qsize().unwrap(), 0);
    }

    #[test]
    fn describe_marks_blocked_tasks() {
        let task = Task::new("b", "1", Priority::Low).after("a");
        let line = describe(&task, &[TaskSignature::of("a", "1")]);
        assert!(line.starts_with("blocked"));
        assert!(line.ends_with("<- a-1"));

        let active = Task::new("a", "1", Priority::High).with_owner(WorkerId::new(2));
        assert!(describe(&active, &[]).starts_with("active(2)"));
    }
}
