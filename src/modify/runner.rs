// restoretool/src/modify/runner.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use super::priority::{PriorityClass, prioritize};
use crate::errors::AppError;
use crate::executor::{DatabaseExecutor, SqlRunner, WorkItem};
use crate::utils::discovery::{Discovery, locate_sql_files};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyReport {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Files in the order they were executed.
    pub order: Vec<PathBuf>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModifyOutcome {
    /// The modify directory does not exist; nothing to do.
    NoModifyDir,
    Completed(ModifyReport),
}

impl ModifyOutcome {
    pub fn failed(&self) -> usize {
        match self {
            ModifyOutcome::NoModifyDir => 0,
            ModifyOutcome::Completed(report) => report.failed,
        }
    }
}

/// Discovers and orders the modification files. `None` means the
/// directory does not exist, which is not an error.
pub fn plan_modifications(modify_dir: &Path) -> Result<Option<Vec<PathBuf>>, AppError> {
    match locate_sql_files(modify_dir)? {
        Discovery::NotFound => {
            info!(
                "Modification directory {} does not exist. No modifications performed.",
                modify_dir.display()
            );
            Ok(None)
        }
        Discovery::Found(files) => {
            let ordered = prioritize(files);
            info!(
                "Found {} modification SQL files in {}",
                ordered.len(),
                modify_dir.display()
            );
            Ok(Some(ordered))
        }
    }
}

/// Applies modification scripts one at a time, in priority order. Only
/// constructed once every restore worker has exited.
#[derive(Debug)]
pub struct ModificationRunner<R> {
    executor: Arc<DatabaseExecutor<R>>,
}

impl<R: SqlRunner> ModificationRunner<R> {
    pub fn new(executor: Arc<DatabaseExecutor<R>>) -> Self {
        ModificationRunner { executor }
    }

    /// Executes `ordered` strictly one file at a time. Individual failures
    /// are logged and the sequence carries on.
    pub async fn apply(&self, ordered: Vec<PathBuf>) -> ModifyReport {
        let start = Instant::now();
        let total = ordered.len();
        let mut succeeded = 0;
        let mut failed = 0;

        for (index, path) in ordered.iter().enumerate() {
            info!(
                "Applying {} modification query in {}",
                PriorityClass::classify(path),
                path.display()
            );

            let result = self.executor.execute(WorkItem::modify(path)).await;
            if result.is_success() {
                succeeded += 1;
                info!(
                    "Modification query in {} executed successfully in {:.2} seconds.",
                    path.display(),
                    result.elapsed.as_secs_f64()
                );
                if !result.output.trim().is_empty() {
                    debug!("Output of {}:\n{}", path.display(), result.output);
                }
            } else if let Some(err) = result.to_error() {
                failed += 1;
                error!(
                    "{} after {:.2} seconds\n{}",
                    err,
                    result.elapsed.as_secs_f64(),
                    err.output().unwrap_or_default()
                );
            }
            info!("Processed {}/{} files", index + 1, total);
        }

        ModifyReport {
            processed: total,
            succeeded,
            failed,
            order: ordered,
            elapsed: start.elapsed(),
        }
    }
}
