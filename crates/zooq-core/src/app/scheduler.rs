//! Scheduler - claim → execute → reclaim のループ
//!
//! # フロー
//! 1. 完了した worker を `reclaim(owner)` で回収（依存タスクが ready になり得る）
//! 2. 空き worker 枠がある限り `claim(owner)` で ready タスクを取得
//! 3. Executor を tokio task として起動
//! 4. 完了通知 / poll 間隔 / shutdown のいずれかを待つ
//!
//! store に書き込むのはこのループだけ（single writer）。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::ExecutorRegistry;
use crate::domain::{Task, TaskSignature, WorkerId};
use crate::error::ZooqError;
use crate::ports::TaskStore;

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// How long to sleep when nothing is ready and no worker finished.
    pub poll_interval: Duration,
    /// Maximum number of concurrently claimed tasks.
    pub max_workers: usize,
    /// Return once nothing is in flight and nothing is ready.
    pub exit_when_idle: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_workers: 1,
            exit_when_idle: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    pub completed: usize,
    pub failed: usize,
}

/// Sent by a worker task when its executor returns.
struct Completion {
    owner: WorkerId,
    task: TaskSignature,
    result: Result<(), ZooqError>,
}

pub struct Scheduler<S> {
    store: S,
    registry: Arc<ExecutorRegistry>,
    options: SchedulerOptions,
    next_worker: WorkerId,
}

impl<S: TaskStore> Scheduler<S> {
    pub fn new(store: S, registry: Arc<ExecutorRegistry>, options: SchedulerOptions) -> Self {
        Self {
            store,
            registry,
            options,
            next_worker: WorkerId::new(1),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Drive the queue until shutdown (or until idle with `exit_when_idle`).
    ///
    /// On shutdown no new task is claimed; workers already running are
    /// awaited and reclaimed before this returns.
    pub async fn run(
        &mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<SchedulerReport, ZooqError> {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();
        let mut report = SchedulerReport::default();
        let mut in_flight = 0usize;
        let mut stopping = *shutdown.borrow();
        let max_workers = self.options.max_workers.max(1);

        info!(max_workers, exit_when_idle = self.options.exit_when_idle, "scheduler started");

        loop {
            while let Ok(done) = done_rx.try_recv() {
                in_flight -= 1;
                self.finish(done, &mut report)?;
            }

            if !stopping {
                while in_flight < max_workers {
                    let owner = self.next_worker;
                    let Some(task) = self.store.claim(owner)? else {
                        break;
                    };
                    self.next_worker = owner.next();
                    in_flight += 1;
                    self.spawn_worker(owner, task, done_tx.clone());
                }
            }

            if in_flight == 0 {
                if stopping {
                    break;
                }
                if self.options.exit_when_idle {
                    let waiting = self.store.wait_size()?;
                    if waiting > 0 {
                        warn!(waiting, "idle with pending tasks that can never become ready");
                    }
                    break;
                }
            }

            tokio::select! {
                Some(done) = done_rx.recv(), if in_flight > 0 => {
                    in_flight -= 1;
                    self.finish(done, &mut report)?;
                }
                changed = shutdown.changed(), if !stopping => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!(in_flight, "shutdown requested; draining workers");
                        stopping = true;
                    }
                }
                _ = tokio::time::sleep(self.options.poll_interval), if !stopping => {}
            }
        }

        info!(completed = report.completed, failed = report.failed, "scheduler stopped");
        Ok(report)
    }

    fn spawn_worker(&self, owner: WorkerId, task: Task, done_tx: mpsc::UnboundedSender<Completion>) {
        let signature = task.signature();
        info!(task = %signature, %owner, deps = task.dependson.len(), "claimed");

        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            let handle = tokio::spawn(async move { registry.execute(&task).await });
            let result = match handle.await {
                Ok(result) => result,
                Err(join_err) => Err(ZooqError::Execution {
                    task: signature.clone(),
                    message: format!("executor aborted: {join_err}"),
                }),
            };
            // receiver is gone only if the scheduler already returned
            let _ = done_tx.send(Completion {
                owner,
                task: signature,
                result,
            });
        });
    }

    fn finish(&mut self, done: Completion, report: &mut SchedulerReport) -> Result<(), ZooqError> {
        match &done.result {
            Ok(()) => {
                report.completed += 1;
                debug!(task = %done.task, owner = %done.owner, "executor finished");
            }
            Err(err) => {
                report.failed += 1;
                warn!(task = %done.task, owner = %done.owner, error = %err, "executor failed");
            }
        }

        if self.store.reclaim(done.owner)? {
            info!(task = %done.task, owner = %done.owner, "reclaimed");
        } else {
            warn!(task = %done.task, owner = %done.owner, "nothing owned by worker; already reclaimed");
        }
        Ok(())
    }
}
