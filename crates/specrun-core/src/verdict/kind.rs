//! Failure kinds
//!
//! The kind of the error that stopped a run directly determines the exit code.

use serde::{Deserialize, Serialize};

/// What stopped a run - maps directly to exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Mismatch or malformed wire value (exit 1)
    Conformance,
    /// Network-level failure talking to the server (exit 2)
    Transport,
    /// Fixture, selection or configuration problem; nothing ran (exit 3)
    Tool,
}

impl FailureKind {
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Conformance => 1,
            Self::Transport => 2,
            Self::Tool => 3,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Conformance => "conformance",
            Self::Transport => "transport",
            Self::Tool => "tool",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
