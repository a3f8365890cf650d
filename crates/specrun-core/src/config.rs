//! Project configuration for conformance runs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default server origin
pub const DEFAULT_BASE_PATH: &str = "http://localhost:3000";

/// Config file names probed by [`Config::load_default`], in order
pub const CONFIG_CANDIDATES: &[&str] = &[".specrun.toml", ".specrun.json", "specrun.toml"];

/// Project configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Server origin prepended to every scenario URI
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Fixture directory to load
    #[serde(default)]
    pub scenarios: Option<PathBuf>,

    /// Include the compiled-in scenario catalogue
    #[serde(default = "default_true")]
    pub builtin: bool,

    /// Transport timeout in seconds (transport default when unset)
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Extra headers sent with every request; per-method headers win
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_base_path() -> String {
    DEFAULT_BASE_PATH.to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            scenarios: None,
            builtin: true,
            timeout_secs: None,
            headers: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load config from file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }

    /// Load from the first config file found in `dir`, or defaults if none.
    ///
    /// # Errors
    ///
    /// Returns error if a config file exists but cannot be read or parsed
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        for name in CONFIG_CANDIDATES {
            let path = dir.join(name);
            if path.exists() {
                return Self::load(&path);
            }
        }

        // No config file, return default
        Ok(Self::default())
    }

    /// Load from the current directory (.specrun.toml)
    ///
    /// # Errors
    ///
    /// Returns error if a config file exists but cannot be read or parsed
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_from_dir(Path::new("."))
    }

    /// Create example config file
    #[must_use]
    pub fn example() -> &'static str {
        r#"# specrun configuration

# Server under test
base_path = "http://localhost:3000"

# Fixture directory (json / yaml scenario files)
# scenarios = "specs"

# Include the built-in scenario catalogue (default: true)
builtin = true

# Transport timeout in seconds (default: transport default)
# timeout_secs = 30

# Extra headers sent with every request
[headers]
# Authorization = "Bearer your-token-here"
"#
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
}
