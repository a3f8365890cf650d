//! What a run executed

use serde::{Deserialize, Serialize};

use crate::scenario::HttpVerb;

/// One executed mock method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodOutcome {
    pub scenario: String,
    pub method: HttpVerb,
    pub url: String,
    /// Response status received
    pub status: u16,
    pub elapsed_ms: u64,
}

/// Successful run summary, in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Names of scenarios whose methods were all executed
    pub scenarios: Vec<String>,
    pub methods: Vec<MethodOutcome>,
    /// Client-side-only scenarios left out of the run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
}

impl RunReport {
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
