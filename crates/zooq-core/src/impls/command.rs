//! CommandExecutor - 外部ツールを起動する Executor
//!
//! コマンドラインと出力先は `{name}` / `{obj}` をプレースホルダとして持つ
//! テンプレート。stdout は出力ファイルへ書き込まれ、既存の内容は毎回
//! 切り詰められる（再実行しても同じ結果になる）。

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::domain::Task;
use crate::error::ZooqError;
use crate::ports::TaskExecutor;

/// How to run one kind of task.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Shell command line template, e.g. `capa -j -q {obj}`.
    pub cmd: String,
    /// Where stdout goes; discarded when `None`.
    pub output: Option<String>,
    pub workdir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            output: None,
            workdir: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }
}

/// Substitute `{name}` and `{obj}` in `template`.
pub fn render(template: &str, task: &Task) -> String {
    template
        .replace("{name}", &task.task_name)
        .replace("{obj}", &task.task_obj)
}

pub struct CommandExecutor {
    spec: CommandSpec,
}

impl CommandExecutor {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    fn output_path(&self, task: &Task) -> Option<PathBuf> {
        let rendered = PathBuf::from(render(self.spec.output.as_deref()?, task));
        match (&self.spec.workdir, rendered.is_relative()) {
            (Some(dir), true) => Some(dir.join(rendered)),
            _ => Some(rendered),
        }
    }
}

#[async_trait]
impl TaskExecutor for CommandExecutor {
    async fn execute(&self, task: &Task) -> Result<(), ZooqError> {
        let line = render(&self.spec.cmd, task);
        info!(task = %task.signature(), owner = ?task.owner, cmd = %line, "starting task process");

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&line);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&line);
            c
        };
        if let Some(dir) = &self.spec.workdir {
            cmd.current_dir(dir);
        }

        let stdout = match self.output_path(task) {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
                let file = tokio::fs::File::create(&path).await?;
                debug!(task = %task.signature(), path = %path.display(), "writing stdout");
                Stdio::from(file.into_std().await)
            }
            None => Stdio::null(),
        };

        cmd.stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;

        // drain stderr so the pipe never fills
        let drain = child.stderr.take().map(|stderr| {
            let sig = task.signature();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(task = %sig, "stderr: {}", line);
                }
            })
        });

        let status = child.wait().await?;
        if let Some(drain) = drain {
            let _ = drain.await;
        }

        let code = status.code().unwrap_or(-1);
        info!(task = %task.signature(), exit_code = code, success = status.success(), "task process exited");

        if status.success() {
            Ok(())
        } else {
            Err(ZooqError::Execution {
                task: task.signature(),
                message: format!("`{line}` exited with code {code}"),
            })
        }
    }
}
