pub(crate) mod progress;
pub(crate) mod scheduler;

pub use scheduler::{RestoreReport, RestoreScheduler};
