//! Verdict - maps a run's outcome to pass/fail and an exit code

use serde::{Deserialize, Serialize};

use super::{FailureKind, RunReport};

/// Final verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub exit_code: i32,
    pub reason: String,
}

/// Pass or fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerdictStatus {
    Pass,
    Fail,
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

impl Verdict {
    /// Verdict for a run that completed without error.
    ///
    /// PASS requires at least one executed method; an empty run is a tool error.
    #[must_use]
    pub fn from_report(report: &RunReport) -> Self {
        if report.is_empty() {
            return Self::failed(FailureKind::Tool, "No scenarios were executed");
        }
        Self {
            status: VerdictStatus::Pass,
            exit_code: 0,
            reason: format!(
                "All {} methods passed across {} scenarios",
                report.method_count(),
                report.scenarios.len()
            ),
        }
    }

    /// Verdict for a run stopped by an error of `kind`.
    #[must_use]
    pub fn failed(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            status: VerdictStatus::Fail,
            exit_code: kind.exit_code(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == VerdictStatus::Pass
    }
}
