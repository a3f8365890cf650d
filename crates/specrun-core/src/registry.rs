//! Scenario registry and fixture loader
//!
//! The registry is built once through [`RegistryBuilder`] and is read-only
//! afterwards. Iteration order is registration order.
//!
//! ```text
//! specs/
//! ├── encode/datetime.yaml      { scenarios: [...] }
//! └── payload/xml.json          { scenarios: [...] }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::scenario::Scenario;

/// Fixture file extensions picked up by [`load_scenarios`].
const FIXTURE_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// Contents of one fixture file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FixtureFile {
    pub scenarios: Vec<Scenario>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Malformed fixture {0}: {1}")]
    Parse(PathBuf, String),
    #[error("Duplicate scenario `{name}` declared in {first} and {second}")]
    DuplicateScenario {
        name: String,
        first: String,
        second: String,
    },
}

/// Immutable name-keyed scenario catalogue
#[derive(Debug, Clone, Default)]
pub struct ScenarioRegistry {
    scenarios: Vec<Scenario>,
    index: HashMap<String, usize>,
}

impl ScenarioRegistry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.index.get(name).map(|&i| &self.scenarios[i])
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Scenarios in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scenarios.iter().map(|s| s.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

/// Accumulates scenarios and rejects duplicate names.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    scenarios: Vec<Scenario>,
    sources: Vec<String>,
    index: HashMap<String, usize>,
}

impl RegistryBuilder {
    /// Add one scenario. `source` names where it came from, for diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::DuplicateScenario`] if the name is already registered.
    pub fn register(&mut self, scenario: Scenario, source: &str) -> Result<(), LoadError> {
        if let Some(&existing) = self.index.get(&scenario.name) {
            return Err(LoadError::DuplicateScenario {
                name: scenario.name,
                first: self.sources[existing].clone(),
                second: source.to_string(),
            });
        }
        self.index.insert(scenario.name.clone(), self.scenarios.len());
        self.scenarios.push(scenario);
        self.sources.push(source.to_string());
        Ok(())
    }

    /// # Errors
    ///
    /// Stops at the first duplicate name.
    pub fn register_all(
        &mut self,
        scenarios: impl IntoIterator<Item = Scenario>,
        source: &str,
    ) -> Result<(), LoadError> {
        scenarios
            .into_iter()
            .try_for_each(|scenario| self.register(scenario, source))
    }

    /// Load every fixture file under `root` and register its scenarios.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] on unreadable or malformed files and duplicate names.
    pub fn load_dir(&mut self, root: &Path) -> Result<(), LoadError> {
        for path in fixture_files(root)? {
            let fixture = read_fixture(&path)?;
            tracing::debug!(
                path = %path.display(),
                count = fixture.scenarios.len(),
                "loaded fixture file"
            );
            self.register_all(fixture.scenarios, &path.display().to_string())?;
        }
        Ok(())
    }

    #[must_use]
    pub fn build(self) -> ScenarioRegistry {
        ScenarioRegistry {
            scenarios: self.scenarios,
            index: self.index,
        }
    }
}

/// Walk `root` and build a registry from every fixture file found.
///
/// Files are visited in sorted path order so registration order is stable.
///
/// # Errors
///
/// Returns [`LoadError`] if the tree cannot be read, a fixture is malformed,
/// or two fixtures declare the same scenario name.
pub fn load_scenarios(root: &Path) -> Result<ScenarioRegistry, LoadError> {
    let mut builder = ScenarioRegistry::builder();
    builder.load_dir(root)?;
    let registry = builder.build();
    tracing::info!(root = %root.display(), scenarios = registry.len(), "scenario registry loaded");
    Ok(registry)
}

/// Parse one fixture file, choosing the format by extension.
///
/// # Errors
///
/// Returns [`LoadError::Io`] or [`LoadError::Parse`].
pub fn read_fixture(path: &Path) -> Result<FixtureFile, LoadError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| LoadError::Io(path.to_path_buf(), e.to_string()))?;

    if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&content).map_err(|e| LoadError::Parse(path.to_path_buf(), e.to_string()))
    } else {
        serde_yml::from_str(&content).map_err(|e| LoadError::Parse(path.to_path_buf(), e.to_string()))
    }
}

fn fixture_files(root: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let mut files = Vec::new();
    collect_fixture_files(root, &mut files)?;
    Ok(files)
}

fn collect_fixture_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), LoadError> {
    let read_dir = std::fs::read_dir(dir).map_err(|e| LoadError::Io(dir.to_path_buf(), e.to_string()))?;
    let mut entries: Vec<PathBuf> = read_dir
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()
        .map_err(|e| LoadError::Io(dir.to_path_buf(), e.to_string()))?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            collect_fixture_files(&path, out)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| FIXTURE_EXTENSIONS.contains(&ext))
        {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{HttpVerb, MockMethod, RequestSpec, ResponseSpec};

    fn scenario(name: &str) -> Scenario {
        Scenario::new(
            name,
            format!("/{name}"),
            vec![MockMethod::new(
                HttpVerb::Get,
                RequestSpec::default(),
                ResponseSpec::status(204),
            )],
        )
    }

    const YAML_FIXTURE: &str = "
scenarios:
  - name: B_Yaml
    uri: /b
    mock_methods:
      - method: get
        response:
          status: 204
";

    const JSON_FIXTURE: &str = r#"{
  "scenarios": [
    {"name": "A_Json", "uri": "/a", "mock_methods": [{"method": "put", "response": {"status": 204}}]}
  ]
}"#;

    #[test]
    fn registration_order_preserved() {
        let mut builder = ScenarioRegistry::builder();
        builder
            .register_all([scenario("Z"), scenario("A"), scenario("M")], "test")
            .unwrap();
        let registry = builder.build();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Z", "A", "M"]);
        assert_eq!(registry.get("A").unwrap().uri, "/A");
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut builder = ScenarioRegistry::builder();
        builder.register(scenario("Dup"), "first.yaml").unwrap();
        let err = builder.register(scenario("Dup"), "second.yaml").unwrap_err();
        assert_eq!(
            err,
            LoadError::DuplicateScenario {
                name: "Dup".into(),
                first: "first.yaml".into(),
                second: "second.yaml".into(),
            }
        );
    }

    #[test]
    fn load_tree_sorted_and_mixed_formats() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/b.yaml"), YAML_FIXTURE).unwrap();
        std::fs::write(dir.path().join("a.json"), JSON_FIXTURE).unwrap();
        std::fs::write(dir.path().join("README.md"), "not a fixture").unwrap();

        let registry = load_scenarios(dir.path()).unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["A_Json", "B_Yaml"]);
        assert_eq!(registry.get("A_Json").unwrap().mock_methods[0].method, HttpVerb::Put);
    }

    #[test]
    fn duplicate_across_files_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("one.yaml"), YAML_FIXTURE).unwrap();
        std::fs::write(dir.path().join("two.yml"), YAML_FIXTURE).unwrap();
        let err = load_scenarios(dir.path()).unwrap_err();
        let LoadError::DuplicateScenario { name, first, second } = err else {
            panic!("expected duplicate error");
        };
        assert_eq!(name, "B_Yaml");
        assert!(first.ends_with("one.yaml"));
        assert!(second.ends_with("two.yml"));
    }

    #[test]
    fn malformed_fixture_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{\"scenarios\": [").unwrap();
        let err = load_scenarios(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::Parse(ref p, _) if p.ends_with("bad.json")));
    }

    #[test]
    fn missing_root_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_scenarios(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, LoadError::Io(..)));
    }
}
