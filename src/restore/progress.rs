// restoretool/src/restore/progress.rs
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Counts as seen immediately after an update, read under the same lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    pub finished: usize,
    pub failed: usize,
    pub total: usize,
}

/// Shared restore progress, handed to every worker behind an `Arc`.
///
/// `finished` only ever grows, and only on a verified success.
#[derive(Debug)]
pub struct ProgressTracker {
    state: Mutex<ProgressSnapshot>,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        ProgressTracker {
            state: Mutex::new(ProgressSnapshot {
                total,
                ..ProgressSnapshot::default()
            }),
        }
    }

    pub fn record_success(&self) -> ProgressSnapshot {
        let mut state = self.lock();
        state.finished += 1;
        *state
    }

    pub fn record_failure(&self) -> ProgressSnapshot {
        let mut state = self.lock();
        state.failed += 1;
        *state
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, ProgressSnapshot> {
        // Counters stay meaningful even if a holder panicked mid-update.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_snapshot_reflects_own_increment() {
        let tracker = ProgressTracker::new(3);
        assert_eq!(
            tracker.record_success(),
            ProgressSnapshot { finished: 1, failed: 0, total: 3 }
        );
        assert_eq!(
            tracker.record_failure(),
            ProgressSnapshot { finished: 1, failed: 1, total: 3 }
        );
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let tracker = Arc::new(ProgressTracker::new(800));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    let mut last = 0;
                    for _ in 0..100 {
                        let snap = tracker.record_success();
                        assert!(snap.finished > last);
                        last = snap.finished;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(tracker.snapshot().finished, 800);
    }

    #[test]
    fn test_independent_trackers_do_not_share_state() {
        let a = ProgressTracker::new(1);
        let b = ProgressTracker::new(5);
        a.record_success();
        assert_eq!(b.snapshot(), ProgressSnapshot { finished: 0, failed: 0, total: 5 });
    }
}
