//! Built-in scenario catalogue
//!
//! A compiled-in table of scenario-constructing functions, one per fixture
//! group. [`builtin`] registers them in table order.

mod encode_datetime;
mod payload_xml;

use crate::registry::{LoadError, RegistryBuilder, ScenarioRegistry};
use crate::scenario::Scenario;

/// `(group name, constructor)` pairs
const CATALOGUE: &[(&str, fn() -> Vec<Scenario>)] = &[
    ("builtin:encode/datetime", encode_datetime::scenarios),
    ("builtin:payload/xml", payload_xml::scenarios),
];

/// Register every built-in scenario into `builder`.
///
/// # Errors
///
/// Returns [`LoadError::DuplicateScenario`] if a name is already registered.
pub fn register_builtin(builder: &mut RegistryBuilder) -> Result<(), LoadError> {
    for (source, scenarios) in CATALOGUE {
        builder.register_all(scenarios(), source)?;
    }
    Ok(())
}

/// Registry holding only the built-in catalogue.
///
/// # Errors
///
/// Returns [`LoadError`] if two built-in groups share a scenario name.
pub fn builtin() -> Result<ScenarioRegistry, LoadError> {
    let mut builder = ScenarioRegistry::builder();
    register_builtin(&mut builder)?;
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{Body, HttpVerb, RequestCheck};

    #[test]
    fn catalogue_registers_without_duplicates() {
        let registry = builtin().unwrap();
        assert_eq!(registry.len(), 19 + 12);
        assert!(registry.contains("Encode_DateTime_Query_Unix_Timestamp"));
        assert!(registry.contains("Payload_Xml_SimpleModel"));
    }

    #[test]
    fn every_builtin_scenario_is_self_consistent() {
        // The declared request must satisfy the declared mock-side checks.
        let registry = builtin().unwrap();
        for scenario in registry.iter() {
            for method in &scenario.mock_methods {
                let req = method.declared_request(&scenario.uri);
                if let Err(e) = method.validate_request(&req) {
                    panic!("{} {}: {e}", scenario.name, method.method);
                }
            }
        }
    }

    #[test]
    fn xml_scenarios_pair_get_and_put() {
        let registry = builtin().unwrap();
        let scenario = registry.get("Payload_Xml_ModelWithAttributes").unwrap();
        let verbs: Vec<HttpVerb> = scenario.mock_methods.iter().map(|m| m.method).collect();
        assert_eq!(verbs, vec![HttpVerb::Get, HttpVerb::Put]);
        assert!(matches!(
            scenario.mock_methods[0].response.body,
            Some(Body::Xml(_))
        ));
        assert!(
            scenario.mock_methods[1]
                .checks
                .iter()
                .any(|c| matches!(c, RequestCheck::XmlBody { .. }))
        );
    }
}
