//! Scenario selection
//!
//! Resolved once against the registry, before any network call.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::registry::ScenarioRegistry;

/// Which scenarios a run covers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Every registered scenario
    #[default]
    All,
    Single(String),
    /// Names read from a selection file
    Names(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("Cannot read selection file {0}: {1}")]
    Io(PathBuf, String),
    #[error("Unknown scenario `{0}`")]
    UnknownScenario(String),
}

impl Selection {
    /// Parse newline-delimited scenario names. Lines are trimmed and blank lines skipped.
    #[must_use]
    pub fn parse_names(text: &str) -> Self {
        Self::Names(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// # Errors
    ///
    /// Returns [`SelectionError::Io`] if the file cannot be read.
    pub fn from_file(path: &Path) -> Result<Self, SelectionError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SelectionError::Io(path.to_path_buf(), e.to_string()))?;
        Ok(Self::parse_names(&text))
    }

    /// Resolve against `registry`. `None` means every scenario.
    ///
    /// A names file with no names selects everything.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::UnknownScenario`] for the first name not registered.
    pub fn resolve(&self, registry: &ScenarioRegistry) -> Result<Option<HashSet<String>>, SelectionError> {
        let names: &[String] = match self {
            Self::All => return Ok(None),
            Self::Single(name) => std::slice::from_ref(name),
            Self::Names(names) if names.is_empty() => return Ok(None),
            Self::Names(names) => names,
        };
        if let Some(unknown) = names.iter().find(|name| !registry.contains(name)) {
            return Err(SelectionError::UnknownScenario(unknown.clone()));
        }
        Ok(Some(names.iter().cloned().collect()))
    }
}
