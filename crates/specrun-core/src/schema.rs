//! JSON Schema of the fixture file format
//!
//! Fixture authors validate their `json` / `yaml` scenario files against it.

use crate::registry::FixtureFile;

/// Generate JSON Schema for fixture files.
#[must_use]
pub fn generate_schema() -> String {
    let schema = schemars::schema_for!(FixtureFile);
    serde_json::to_string_pretty(&schema).expect("schema serialization should not fail")
}
