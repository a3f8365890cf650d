//! Structural XML equality
//!
//! Element names, attribute sets, child element order and text content must
//! match. Text is compared per run between child elements, so the position of
//! text in mixed content is significant. Whitespace-only text between elements
//! is formatting and is ignored; surrounding whitespace of each run is trimmed.
//!
//! Names compare by resolved namespace URI. Prefixes and the `xmlns`
//! declarations that bind them are not compared.

use std::collections::BTreeMap;

use roxmltree::{Document, Node};

use super::{Mismatch, MismatchSubject};

/// Compare two XML documents structurally.
///
/// # Errors
///
/// Returns a body [`Mismatch`] carrying both documents, with the element path
/// of the first difference as detail. A document that is not well-formed is
/// always a mismatch.
pub fn xml_equal(expected: &str, actual: &str) -> Result<(), Mismatch> {
    let mismatch = |detail: String| {
        Mismatch::new(MismatchSubject::Body, expected.trim(), actual.trim()).with_detail(detail)
    };

    let expected_doc = Document::parse(expected)
        .map_err(|e| mismatch(format!("expected XML is not well-formed: {e}")))?;
    let actual_doc = Document::parse(actual)
        .map_err(|e| mismatch(format!("actual XML is not well-formed: {e}")))?;

    let root = expected_doc.root_element();
    compare_element(root, actual_doc.root_element(), &format!("/{}", root.tag_name().name()))
        .map_err(mismatch)
}

fn compare_element(expected: Node, actual: Node, path: &str) -> Result<(), String> {
    if expected.tag_name() != actual.tag_name() {
        return Err(format!(
            "at {path}: element <{}> != <{}>",
            qualified_name(expected),
            qualified_name(actual)
        ));
    }

    let expected_attrs = attributes(expected);
    let actual_attrs = attributes(actual);
    if expected_attrs != actual_attrs {
        return Err(format!(
            "at {path}: attributes {expected_attrs:?} != {actual_attrs:?}"
        ));
    }

    let expected_children: Vec<Node> = expected.children().filter(Node::is_element).collect();
    let actual_children: Vec<Node> = actual.children().filter(Node::is_element).collect();
    if expected_children.len() != actual_children.len() {
        return Err(format!(
            "at {path}: {} child elements != {}",
            expected_children.len(),
            actual_children.len()
        ));
    }

    let mut runs = text_runs(expected).into_iter().zip(text_runs(actual));
    if let Some((expected_text, actual_text)) = runs.find(|(e, a)| e != a) {
        return Err(format!(
            "at {path}: text {expected_text:?} != {actual_text:?}"
        ));
    }

    for (i, (e, a)) in expected_children.into_iter().zip(actual_children).enumerate() {
        let child_path = format!("{path}/{}[{i}]", e.tag_name().name());
        compare_element(e, a, &child_path)?;
    }
    Ok(())
}

fn qualified_name(node: Node) -> String {
    let tag = node.tag_name();
    match tag.namespace() {
        Some(ns) => format!("{{{ns}}}{}", tag.name()),
        None => tag.name().to_string(),
    }
}

fn attributes(node: Node) -> BTreeMap<String, String> {
    node.attributes()
        .map(|a| {
            let key = match a.namespace() {
                Some(ns) => format!("{{{ns}}}{}", a.name()),
                None => a.name().to_string(),
            };
            (key, a.value().to_string())
        })
        .collect()
}

/// Direct text split at each child element: one more run than child elements,
/// each trimmed.
fn text_runs(node: Node) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = String::new();
    for child in node.children() {
        if child.is_element() {
            runs.push(current.trim().to_string());
            current.clear();
        } else if child.is_text() {
            current.push_str(child.text().unwrap_or_default());
        }
    }
    runs.push(current.trim().to_string());
    runs
}
