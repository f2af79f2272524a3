// restoretool/src/executor/mod.rs
pub mod client;

use chrono::{DateTime, Local};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::errors::AppError;

pub use client::{CommandRunner, SqlRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkKind {
    Restore,
    Modify,
}

impl fmt::Display for WorkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkKind::Restore => write!(f, "restore"),
            WorkKind::Modify => write!(f, "modify"),
        }
    }
}

/// One SQL file queued for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    kind: WorkKind,
    path: PathBuf,
}

impl WorkItem {
    pub fn new(kind: WorkKind, path: impl Into<PathBuf>) -> Self {
        WorkItem {
            kind,
            path: path.into(),
        }
    }

    pub fn restore(path: impl Into<PathBuf>) -> Self {
        Self::new(WorkKind::Restore, path)
    }

    pub fn modify(path: impl Into<PathBuf>) -> Self {
        Self::new(WorkKind::Modify, path)
    }

    pub fn kind(&self) -> WorkKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub item: WorkItem,
    pub outcome: Outcome,
    pub elapsed: Duration,
    /// Combined stdout+stderr of the client, empty if it never ran.
    pub output: String,
    /// Why the item failed; `None` on success.
    pub failure: Option<String>,
    pub started_at: DateTime<Local>,
    pub completed_at: DateTime<Local>,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// The failure as an [`AppError::Execution`], for logging at the item boundary.
    pub fn to_error(&self) -> Option<AppError> {
        if self.is_success() {
            return None;
        }
        Some(AppError::Execution {
            path: self.item.path().to_path_buf(),
            message: self
                .failure
                .clone()
                .unwrap_or_else(|| "unknown error".to_string()),
            output: self.output.clone(),
        })
    }
}

/// Runs one file at a time against the database through a [`SqlRunner`].
///
/// This never returns an error: every way a file can fail ends up as an
/// [`ExecutionResult`] with [`Outcome::Failure`] and whatever output was captured.
#[derive(Debug)]
pub struct DatabaseExecutor<R> {
    runner: R,
}

impl<R: SqlRunner> DatabaseExecutor<R> {
    pub fn new(runner: R) -> Self {
        DatabaseExecutor { runner }
    }

    #[cfg(test)]
    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub async fn execute(&self, item: WorkItem) -> ExecutionResult {
        let path = item.path().to_path_buf();
        info!("Running {} file {}", item.kind(), path.display());

        match tokio::fs::metadata(&path).await.and_then(|m| m.modified()) {
            Ok(modified) => {
                let modified: DateTime<Local> = modified.into();
                info!("Last Modified: {}", modified.to_rfc3339());
            }
            Err(e) => warn!("Error getting modification time for {}: {}", path.display(), e),
        }

        let started_at = Local::now();
        let start = Instant::now();

        let (outcome, output, failure) = match tokio::fs::read(&path).await {
            Err(e) => (
                Outcome::Failure,
                String::new(),
                Some(format!("failed to read SQL file: {}", e)),
            ),
            Ok(sql) => match self.runner.run(sql).await {
                Ok(out) if out.success => (Outcome::Success, out.combined, None),
                Ok(out) => (
                    Outcome::Failure,
                    out.combined,
                    Some(format!("client exited with {}", out.status)),
                ),
                Err(e) => (Outcome::Failure, String::new(), Some(e.to_string())),
            },
        };

        ExecutionResult {
            item,
            outcome,
            elapsed: start.elapsed(),
            output,
            failure,
            started_at,
            completed_at: Local::now(),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::client::CommandOutput;
    use super::*;
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Debug, Clone)]
    pub(crate) struct RecordedCall {
        pub sql: String,
        pub started: Instant,
        pub finished: Instant,
    }

    /// In-memory stand-in for the database client. SQL containing any of
    /// `fail_markers` exits non-zero; SQL containing any of `error_markers`
    /// fails to "spawn".
    #[derive(Debug, Default)]
    pub(crate) struct RecordingRunner {
        calls: Mutex<Vec<RecordedCall>>,
        fail_markers: Vec<String>,
        error_markers: Vec<String>,
        delay: Duration,
    }

    impl RecordingRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_on(mut self, marker: &str) -> Self {
            self.fail_markers.push(marker.to_string());
            self
        }

        pub fn erroring_on(mut self, marker: &str) -> Self {
            self.error_markers.push(marker.to_string());
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn executed_sql(&self) -> Vec<String> {
            self.calls().into_iter().map(|c| c.sql).collect()
        }
    }

    impl SqlRunner for RecordingRunner {
        async fn run(&self, sql: Vec<u8>) -> Result<CommandOutput, AppError> {
            let started = Instant::now();
            let sql = String::from_utf8_lossy(&sql).into_owned();
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.calls.lock().unwrap().push(RecordedCall {
                sql: sql.clone(),
                started,
                finished: Instant::now(),
            });

            if self.error_markers.iter().any(|m| sql.contains(m.as_str())) {
                return Err(AppError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "mysql: not found",
                )));
            }
            let failed = self.fail_markers.iter().any(|m| sql.contains(m.as_str()));
            Ok(CommandOutput {
                success: !failed,
                status: if failed { "exit status: 1" } else { "exit status: 0" }.to_string(),
                combined: if failed {
                    format!("ERROR 1064 (42000) near: {}", sql.trim())
                } else {
                    String::new()
                },
            })
        }
    }

    /// Writes `name` under `dir` with the file name itself as content, so the
    /// recorded SQL identifies which file ran.
    pub(crate) fn write_sql(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, format!("-- {}\n", name)).unwrap();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{write_sql, RecordingRunner};
    use super::*;

    #[tokio::test]
    async fn test_successful_execution_captures_timing() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_sql(dir.path(), "users.sql");
        let executor = DatabaseExecutor::new(RecordingRunner::new());

        let result = executor.execute(WorkItem::restore(&path)).await;

        assert!(result.is_success());
        assert_eq!(result.item.kind(), WorkKind::Restore);
        assert_eq!(result.item.path(), path.as_path());
        assert!(result.failure.is_none());
        assert!(result.to_error().is_none());
        assert!(result.completed_at >= result.started_at);
        assert_eq!(executor.runner().executed_sql(), vec!["-- users.sql\n"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_a_failure_with_output() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_sql(dir.path(), "broken.sql");
        let executor = DatabaseExecutor::new(RecordingRunner::new().failing_on("broken"));

        let result = executor.execute(WorkItem::modify(&path)).await;

        assert_eq!(result.outcome, Outcome::Failure);
        assert!(result.output.contains("ERROR 1064"));
        assert_eq!(result.failure.as_deref(), Some("client exited with exit status: 1"));
        match result.to_error() {
            Some(AppError::Execution { path: failed, output, .. }) => {
                assert_eq!(failed, path);
                assert!(output.contains("ERROR 1064"));
            }
            other => panic!("expected an execution error, got {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_spawn_failure_is_a_failure_not_a_panic() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_sql(dir.path(), "any.sql");
        let executor = DatabaseExecutor::new(RecordingRunner::new().erroring_on("any"));

        let result = executor.execute(WorkItem::restore(&path)).await;

        assert!(!result.is_success());
        assert!(result.failure.unwrap_or_default().contains("mysql: not found"));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_is_a_failure_and_client_is_not_called() {
        let executor = DatabaseExecutor::new(RecordingRunner::new());

        let result = executor
            .execute(WorkItem::restore("/nonexistent/restoretool/gone.sql"))
            .await;

        assert!(!result.is_success());
        assert!(result.failure.unwrap_or_default().starts_with("failed to read SQL file"));
        assert!(executor.runner().calls().is_empty());
    }
}
