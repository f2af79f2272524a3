// restoretool/src/pipeline/logic.rs
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

use crate::errors::AppError;
use crate::executor::{DatabaseExecutor, SqlRunner};
use crate::modify::{ModificationRunner, ModifyOutcome, plan_modifications};
use crate::restore::{RestoreReport, RestoreScheduler};
use crate::utils::discovery::find_and_sort_sql_files;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE: u8 = 2;
pub const EXIT_CONNECTIVITY: u8 = 3;
pub const EXIT_PARTIAL_FAILURE: u8 = 4;

/// Orchestration states. Every edge is traversed at most once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    DiscoveringRestore,
    Restoring,
    Barrier,
    DiscoveringModify,
    Modifying,
    Complete,
    FailedComplete,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Init => "init",
            Phase::DiscoveringRestore => "discovering restore files",
            Phase::Restoring => "restoring",
            Phase::Barrier => "restore barrier",
            Phase::DiscoveringModify => "discovering modification files",
            Phase::Modifying => "modifying",
            Phase::Complete => "complete",
            Phase::FailedComplete => "failed-complete",
        };
        f.write_str(label)
    }
}

#[derive(Debug)]
struct PhaseTracker {
    current: Phase,
}

impl PhaseTracker {
    fn new() -> Self {
        PhaseTracker {
            current: Phase::Init,
        }
    }

    fn advance(&mut self, next: Phase) {
        info!("Phase: {} -> {}", self.current, next);
        self.current = next;
    }
}

/// Typed result of a whole run.
#[derive(Debug)]
pub struct RunSummary {
    pub restore: RestoreReport,
    /// `Err` when the modify directory exists but could not be traversed.
    pub modify: Result<ModifyOutcome, AppError>,
    pub total_elapsed: Duration,
    pub final_phase: Phase,
}

impl RunSummary {
    pub fn failed_files(&self) -> usize {
        let modify_failed = self.modify.as_ref().map(ModifyOutcome::failed).unwrap_or(0);
        self.restore.failed + modify_failed
    }

    pub fn exit_code(&self) -> u8 {
        if self.modify.is_err() || self.failed_files() > 0 {
            EXIT_PARTIAL_FAILURE
        } else {
            EXIT_SUCCESS
        }
    }
}

/// Restore everything under `restore_path` in parallel, wait for every
/// worker, then apply `modify_dir` sequentially in priority order.
///
/// Only a restore discovery failure is returned as `Err`; a modify discovery
/// failure ends the run in [`Phase::FailedComplete`] with the restore results intact.
pub async fn perform_pipeline_orchestration<R: SqlRunner>(
    executor: Arc<DatabaseExecutor<R>>,
    restore_path: &Path,
    modify_dir: &Path,
    worker_count: usize,
) -> Result<RunSummary, AppError> {
    let total_start = Instant::now();
    let mut phase = PhaseTracker::new();

    phase.advance(Phase::DiscoveringRestore);
    let restore_files = find_and_sort_sql_files(restore_path)?;
    info!(
        "Found {} SQL restore files under {} (sorted alphabetically)",
        restore_files.len(),
        restore_path.display()
    );

    phase.advance(Phase::Restoring);
    let restore = RestoreScheduler::new(Arc::clone(&executor), worker_count)
        .run(restore_files)
        .await;

    phase.advance(Phase::Barrier);
    info!(
        "Database restore completed in {:.2?}: {}/{} files restored, {} failed",
        restore.elapsed, restore.finished, restore.total, restore.failed
    );

    phase.advance(Phase::DiscoveringModify);
    let modify = match plan_modifications(modify_dir) {
        Ok(None) => {
            phase.advance(Phase::Complete);
            Ok(ModifyOutcome::NoModifyDir)
        }
        Ok(Some(ordered)) => {
            phase.advance(Phase::Modifying);
            let report = ModificationRunner::new(executor).apply(ordered).await;
            info!(
                "Post-restore modifications completed in {:.2?}: {}/{} succeeded, {} failed",
                report.elapsed, report.succeeded, report.processed, report.failed
            );
            phase.advance(Phase::Complete);
            Ok(ModifyOutcome::Completed(report))
        }
        Err(e) => {
            error!("Error performing post-restore modifications: {}", e);
            phase.advance(Phase::FailedComplete);
            Err(e)
        }
    };

    let total_elapsed = total_start.elapsed();
    info!("Total execution time: {:.2?}", total_elapsed);

    Ok(RunSummary {
        restore,
        modify,
        total_elapsed,
        final_phase: phase.current,
    })
}
