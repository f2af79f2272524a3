// restoretool/src/restore/scheduler.rs
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use super::progress::ProgressTracker;
use crate::executor::{DatabaseExecutor, SqlRunner, WorkItem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub total: usize,
    pub finished: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub completed_at: DateTime<Local>,
}

impl RestoreReport {
    pub fn all_succeeded(&self) -> bool {
        self.finished == self.total
    }
}

type SharedQueue = Arc<Mutex<mpsc::Receiver<WorkItem>>>;

/// Fixed-size pool of workers draining one shared queue of restore files.
#[derive(Debug)]
pub struct RestoreScheduler<R> {
    executor: Arc<DatabaseExecutor<R>>,
    worker_count: usize,
}

impl<R: SqlRunner> RestoreScheduler<R> {
    pub fn new(executor: Arc<DatabaseExecutor<R>>, worker_count: usize) -> Self {
        RestoreScheduler {
            executor,
            worker_count: worker_count.max(1),
        }
    }

    /// Enqueues `files` in order, closes the queue and waits for every worker to exit.
    ///
    /// A failed file is logged and skipped; it never stops the other workers.
    pub async fn run(&self, files: Vec<PathBuf>) -> RestoreReport {
        let start = Instant::now();
        let progress = Arc::new(ProgressTracker::new(files.len()));

        if files.is_empty() {
            info!("No restore files to process.");
            return Self::report(&progress, start);
        }

        let (tx, rx) = mpsc::channel::<WorkItem>(self.worker_count);
        let queue: SharedQueue = Arc::new(Mutex::new(rx));

        let mut workers = JoinSet::new();
        for id in 0..self.worker_count {
            workers.spawn(Self::worker_loop(
                id,
                Arc::clone(&self.executor),
                Arc::clone(&queue),
                Arc::clone(&progress),
            ));
        }
        info!(
            "Started {} restore workers for {} files",
            self.worker_count,
            files.len()
        );

        for path in files {
            if tx.send(WorkItem::restore(path)).await.is_err() {
                error!("All restore workers exited before the queue was drained");
                break;
            }
        }
        // Closing intake is the workers' shutdown signal.
        drop(tx);

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("Restore worker terminated abnormally: {}", e);
            }
        }

        Self::report(&progress, start)
    }

    async fn worker_loop(
        id: usize,
        executor: Arc<DatabaseExecutor<R>>,
        queue: SharedQueue,
        progress: Arc<ProgressTracker>,
    ) {
        loop {
            let next = queue.lock().await.recv().await;
            let Some(item) = next else { break };

            let result = executor.execute(item).await;
            let path = result.item.path().display();
            if result.is_success() {
                let snapshot = progress.record_success();
                info!(
                    "Restore of {} completed in {:.2} seconds ({} to {})",
                    path,
                    result.elapsed.as_secs_f64(),
                    result.started_at.format("%H:%M:%S%.3f"),
                    result.completed_at.format("%H:%M:%S%.3f")
                );
                if !result.output.trim().is_empty() {
                    debug!("Output of {}:\n{}", path, result.output);
                }
                info!(
                    "Progress: {}/{} files successfully restored",
                    snapshot.finished, snapshot.total
                );
            } else if let Some(err) = result.to_error() {
                progress.record_failure();
                error!(
                    "{} after {:.2} seconds (skipped)\n{}",
                    err,
                    result.elapsed.as_secs_f64(),
                    err.output().unwrap_or_default()
                );
            }
        }
        debug!("Restore worker {} exiting", id);
    }

    fn report(progress: &ProgressTracker, start: Instant) -> RestoreReport {
        let snapshot = progress.snapshot();
        RestoreReport {
            total: snapshot.total,
            finished: snapshot.finished,
            failed: snapshot.failed,
            elapsed: start.elapsed(),
            completed_at: Local::now(),
        }
    }
}
