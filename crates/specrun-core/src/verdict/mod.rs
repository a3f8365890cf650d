//! Verdict module - run report, failure kinds, and exit codes

mod kind;
mod policy;
mod report;

pub use kind::FailureKind;
pub use policy::{Verdict, VerdictStatus};
pub use report::{MethodOutcome, RunReport};
