//! Equality engine
//!
//! Decides whether an actual wire value is equivalent to the declared one.
//! The rule is chosen by the [`Body`] tag, never by inspecting the value:
//!
//! | Tag          | Rule                                                     |
//! |--------------|----------------------------------------------------------|
//! | `xml`        | structural XML equality ([`xml`])                        |
//! | `raw`        | exact bytes, or base64 under `content` if JSON accepted  |
//! | `base64_raw` | base64 under `content`                                   |
//! | `json`       | canonical-serialization equality ([`json`])              |
//!
//! Every failing comparison produces a [`Mismatch`] carrying both sides.

pub mod json;
pub mod xml;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::format::{CollectionFormat, decode_collection};
use crate::scenario::{Body, QueryValue};

pub use json::{JsonMode, canonical_json, json_equal};
pub use xml::xml_equal;

/// Response field holding a pagination continuation link.
pub const NEXT_LINK_FIELD: &str = "nextLink";

/// Placeholder rendered when an expected key is not present at all.
const ABSENT: &str = "<absent>";

/// What part of the exchange diverged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MismatchSubject {
    Status,
    Body,
    Header(String),
    QueryParam(String),
}

impl std::fmt::Display for MismatchSubject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status => write!(f, "status code"),
            Self::Body => write!(f, "body"),
            Self::Header(name) => write!(f, "header `{name}`"),
            Self::QueryParam(name) => write!(f, "query parameter `{name}`"),
        }
    }
}

/// Expected vs. actual divergence, with both representations kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub subject: MismatchSubject,
    pub expected: String,
    pub actual: String,
    /// Where inside a structured value the first difference was found
    pub detail: Option<String>,
}

impl Mismatch {
    #[must_use]
    pub fn new(
        subject: MismatchSubject,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            subject,
            expected: expected.into(),
            actual: actual.into(),
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} mismatch: expected {} - actual {}",
            self.subject, self.expected, self.actual
        )?;
        if let Some(detail) = &self.detail {
            write!(f, " ({detail})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Mismatch {}

/// Compare an actual body against the declared one.
///
/// `accepts_json` is whether the request declared `accept: application/json`;
/// it switches raw byte bodies to their base64 `{"content": ...}` transport form.
///
/// # Errors
///
/// Returns [`Mismatch`] on any type or encoding divergence.
pub fn compare_body(expected: &Body, actual: &[u8], accepts_json: bool) -> Result<(), Mismatch> {
    match expected {
        Body::Xml(xml) => xml_equal(xml, &String::from_utf8_lossy(actual)),
        Body::Raw(bytes) if !accepts_json => {
            if bytes.as_slice() == actual {
                Ok(())
            } else {
                Err(Mismatch::new(
                    MismatchSubject::Body,
                    String::from_utf8_lossy(bytes),
                    String::from_utf8_lossy(actual),
                ))
            }
        }
        Body::Raw(bytes) | Body::Base64Raw(bytes) => compare_base64_content(bytes, actual),
        Body::Json(value) => {
            let parsed: serde_json::Value = serde_json::from_slice(actual).map_err(|e| {
                Mismatch::new(
                    MismatchSubject::Body,
                    canonical_json(value, JsonMode::Exact),
                    String::from_utf8_lossy(actual),
                )
                .with_detail(format!("actual body is not JSON: {e}"))
            })?;
            json_equal(value, &parsed, JsonMode::Exact)
        }
    }
}

fn compare_base64_content(expected: &[u8], actual: &[u8]) -> Result<(), Mismatch> {
    let expected_b64 = BASE64.encode(expected);
    let content = serde_json::from_slice::<serde_json::Value>(actual)
        .ok()
        .and_then(|v| v.get("content").and_then(|c| c.as_str()).map(str::to_string));
    match content {
        Some(c) if c == expected_b64 => Ok(()),
        Some(c) => Err(Mismatch::new(MismatchSubject::Body, expected_b64, c)
            .with_detail("base64 `content` differs")),
        None => Err(Mismatch::new(
            MismatchSubject::Body,
            expected_b64,
            String::from_utf8_lossy(actual),
        )
        .with_detail("expected a JSON object with a string `content` field")),
    }
}

/// Prefix a relative pagination link with `base_path`.
///
/// Only a top-level `nextLink` string of a JSON object body is rewritten;
/// every other body is returned unchanged.
#[must_use]
pub fn rewrite_pagination_link(body: &Body, base_path: &str) -> Body {
    let mut rewritten = body.clone();
    if let Body::Json(serde_json::Value::Object(map)) = &mut rewritten {
        if let Some(serde_json::Value::String(link)) = map.get_mut(NEXT_LINK_FIELD) {
            *link = format!("{base_path}{link}");
        }
    }
    rewritten
}

/// Case-insensitive header lookup. Returns the first value for `name`.
#[must_use]
pub fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Header equality: case-insensitive key, exact value.
///
/// # Errors
///
/// Returns [`Mismatch`] if the header is absent or its value differs.
pub fn check_header(
    headers: &[(String, String)],
    name: &str,
    expected: &str,
) -> Result<(), Mismatch> {
    match find_header(headers, name) {
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => Err(Mismatch::new(
            MismatchSubject::Header(name.to_string()),
            expected,
            actual,
        )),
        None => Err(Mismatch::new(
            MismatchSubject::Header(name.to_string()),
            expected,
            ABSENT,
        )),
    }
}

/// Every raw value of `name` in the query, in source order.
#[must_use]
pub fn query_values<'a>(query: &'a [(String, String)], name: &str) -> Vec<&'a str> {
    query
        .iter()
        .filter(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .collect()
}

/// Query-parameter containment.
///
/// The occurrences of `name` are decoded with `format` (or taken verbatim when
/// no format is declared) and must equal the expected sequence exactly.
/// Unrelated parameters are ignored.
///
/// # Errors
///
/// Returns [`Mismatch`] if the parameter is absent or decodes differently.
pub fn check_query_param(
    query: &[(String, String)],
    name: &str,
    expected: &QueryValue,
    format: Option<CollectionFormat>,
) -> Result<(), Mismatch> {
    let occurrences = query_values(query, name);
    let subject = MismatchSubject::QueryParam(name.to_string());
    if occurrences.is_empty() {
        return Err(Mismatch::new(subject, expected.to_string(), ABSENT));
    }

    let actual: Vec<String> = match format {
        Some(f) => decode_collection(&occurrences, f),
        None => occurrences.iter().map(|s| (*s).to_string()).collect(),
    };
    if actual == expected.as_slice() {
        return Ok(());
    }

    let rendered = match actual.as_slice() {
        [single] => single.clone(),
        many => format!("{many:?}"),
    };
    let mismatch = Mismatch::new(subject, expected.to_string(), rendered);
    Err(match format {
        Some(f) => mismatch.with_detail(format!("decoded as {f}")),
        None => mismatch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn json_body_key_order_insignificant() {
        let expected = Body::Json(json!({"name": "foo", "age": 123}));
        assert!(compare_body(&expected, br#"{"age":123,"name":"foo"}"#, false).is_ok());
    }

    #[test]
    fn json_body_type_sensitive() {
        let expected = Body::Json(json!({"value": 123}));
        let err = compare_body(&expected, br#"{"value":"123"}"#, false).unwrap_err();
        assert_eq!(err.subject, MismatchSubject::Body);
        assert_eq!(err.expected, r#"{"value":123}"#);
        assert_eq!(err.actual, r#"{"value":"123"}"#);
    }

    #[test]
    fn json_body_not_json_is_mismatch() {
        let expected = Body::Json(json!({"value": 1}));
        let err = compare_body(&expected, b"<value>1</value>", false).unwrap_err();
        assert_eq!(err.actual, "<value>1</value>");
        assert!(err.detail.unwrap().contains("not JSON"));
    }

    #[test]
    fn xml_body_dispatches_to_structural_compare() {
        let expected = Body::Xml("<a>\n  <b>1</b>\n</a>".into());
        assert!(compare_body(&expected, b"<a><b>1</b></a>", false).is_ok());
        assert!(compare_body(&expected, b"<a><b>2</b></a>", false).is_err());
    }

    #[test]
    fn raw_body_compared_byte_for_byte() {
        let expected = Body::Raw(b"hello, world!".to_vec());
        assert!(compare_body(&expected, b"hello, world!", false).is_ok());
        let err = compare_body(&expected, b"hello", false).unwrap_err();
        assert_eq!(err.expected, "hello, world!");
        assert_eq!(err.actual, "hello");
    }

    #[test]
    fn raw_body_distinct_invalid_utf8_is_mismatch() {
        let expected = Body::Raw(vec![0xFF, 0xD8, 0xFF, 0xE0]);
        assert!(compare_body(&expected, &[0xFF, 0xD8, 0xFF, 0xE0], false).is_ok());
        let err = compare_body(&expected, &[0xFE, 0xC0, 0xFE, 0x80], false).unwrap_err();
        assert_eq!(err.subject, MismatchSubject::Body);
    }

    #[test]
    fn raw_body_with_json_accept_uses_base64_content() {
        let expected = Body::Raw(b"test".to_vec());
        assert!(compare_body(&expected, br#"{"content":"dGVzdA=="}"#, true).is_ok());
        let err = compare_body(&expected, br#"{"content":"dGVzdA"}"#, true).unwrap_err();
        assert_eq!(err.expected, "dGVzdA==");
        assert_eq!(err.actual, "dGVzdA");
    }

    #[test]
    fn base64_raw_ignores_accept() {
        let expected = Body::Base64Raw(b"test".to_vec());
        assert!(compare_body(&expected, br#"{"content":"dGVzdA=="}"#, false).is_ok());
        let err = compare_body(&expected, b"test", false).unwrap_err();
        assert!(err.detail.unwrap().contains("content"));
    }

    #[test]
    fn next_link_prefixed_with_base_path() {
        let body = Body::Json(json!({"items": [1], "nextLink": "/foo"}));
        let rewritten = rewrite_pagination_link(&body, "http://h");
        assert_eq!(
            rewritten,
            Body::Json(json!({"items": [1], "nextLink": "http://h/foo"}))
        );
    }

    #[test]
    fn next_link_absent_leaves_body_unchanged() {
        let body = Body::Json(json!({"items": []}));
        assert_eq!(rewrite_pagination_link(&body, "http://h"), body);
        let xml = Body::Xml("<nextLink>/foo</nextLink>".into());
        assert_eq!(rewrite_pagination_link(&xml, "http://h"), xml);
    }

    #[test]
    fn header_lookup_case_insensitive_value_exact() {
        let headers = pairs(&[("Content-Type", "application/xml")]);
        assert!(check_header(&headers, "content-type", "application/xml").is_ok());
        let err = check_header(&headers, "content-type", "Application/XML").unwrap_err();
        assert_eq!(err.subject, MismatchSubject::Header("content-type".into()));
    }

    #[test]
    fn header_absent_reported() {
        let err = check_header(&[], "value", "1").unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"header `value` mismatch: expected 1 - actual <absent>");
    }

    #[test]
    fn query_single_value_contained() {
        let query = pairs(&[("other", "x"), ("value", "1686566864")]);
        let expected = QueryValue::One("1686566864".into());
        assert!(check_query_param(&query, "value", &expected, None).is_ok());
    }

    #[test]
    fn query_single_value_mismatch_is_descriptive() {
        let query = pairs(&[("value", "2023-06-12T12:01:04Z")]);
        let expected = QueryValue::One("1686566864".into());
        let err = check_query_param(&query, "value", &expected, None).unwrap_err();
        insta::assert_snapshot!(
            err.to_string(),
            @"query parameter `value` mismatch: expected 1686566864 - actual 2023-06-12T12:01:04Z"
        );
    }

    #[test]
    fn query_csv_collection() {
        let query = pairs(&[("value", "1686566864,1686734256")]);
        let expected = QueryValue::Many(vec!["1686566864".into(), "1686734256".into()]);
        assert!(check_query_param(&query, "value", &expected, Some(CollectionFormat::Csv)).is_ok());
        assert!(
            check_query_param(&query, "value", &expected, Some(CollectionFormat::Pipes)).is_err()
        );
    }

    #[test]
    fn query_multi_collection_order_matters() {
        let query = pairs(&[("colors", "blue"), ("colors", "red")]);
        let expected = QueryValue::Many(vec!["blue".into(), "red".into()]);
        assert!(
            check_query_param(&query, "colors", &expected, Some(CollectionFormat::Multi)).is_ok()
        );
        let reversed = QueryValue::Many(vec!["red".into(), "blue".into()]);
        let err = check_query_param(&query, "colors", &reversed, Some(CollectionFormat::Multi))
            .unwrap_err();
        assert_eq!(err.detail.as_deref(), Some("decoded as multi"));
    }

    #[test]
    fn query_repeated_key_without_format_is_mismatch() {
        let query = pairs(&[("value", "a"), ("value", "a")]);
        let expected = QueryValue::One("a".into());
        assert!(check_query_param(&query, "value", &expected, None).is_err());
    }

    #[test]
    fn query_absent_key() {
        let err =
            check_query_param(&[], "value", &QueryValue::One("1".into()), None).unwrap_err();
        assert_eq!(err.actual, "<absent>");
    }
}
