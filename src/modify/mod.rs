pub(crate) mod priority;
pub(crate) mod runner;

pub use runner::{ModificationRunner, ModifyOutcome, plan_modifications};
