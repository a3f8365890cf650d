//! Scenario model
//!
//! A [`Scenario`] is one named conformance case bound to a URI. Each of its
//! [`MockMethod`]s declares the request a client is expected to send, the
//! response the mock side returns, and the [`RequestCheck`]s the mock side
//! applies to an incoming request.
//!
//! The mock method's two operations are kept apart:
//! [`MockMethod::validate_request`] only judges, [`MockMethod::build_response`]
//! only synthesizes. A mock server composes them.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::compare::{
    JsonMode, Mismatch, MismatchSubject, check_header, check_query_param, find_header,
    json_equal, query_values, xml_equal,
};
use crate::format::{CollectionFormat, DateFormat, FormatError, parse_instant};

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_XML: &str = "application/xml";
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

/// HTTP verb of a mock method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HttpVerb {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl HttpVerb {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        }
    }

    /// `head`, `get` and `delete` conventionally carry no request body.
    #[must_use]
    pub const fn conventionally_bodiless(self) -> bool {
        matches!(self, Self::Get | Self::Head | Self::Delete)
    }
}

impl std::fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a scenario is exercised against a live server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub enum ScenarioKind {
    /// Runnable against a live server
    #[default]
    MockApiDefinition,
    /// Client-side only; skipped by the executor
    MockApi,
}

/// A body tagged by content kind. The tag selects the equality rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Body {
    Json(serde_json::Value),
    /// Raw XML document text
    Xml(String),
    /// Raw bytes (base64 in fixture files)
    Raw(
        #[serde(with = "base64_bytes")]
        #[schemars(with = "String")]
        Vec<u8>,
    ),
    /// Raw bytes transported as `{"content": "<base64>"}`
    Base64Raw(
        #[serde(with = "base64_bytes")]
        #[schemars(with = "String")]
        Vec<u8>,
    ),
}

impl Body {
    #[must_use]
    pub fn json(value: serde_json::Value) -> Self {
        Self::Json(value)
    }

    #[must_use]
    pub fn xml(text: impl Into<String>) -> Self {
        Self::Xml(text.into())
    }

    #[must_use]
    pub const fn content_type(&self) -> &'static str {
        match self {
            Self::Json(_) | Self::Base64Raw(_) => CONTENT_TYPE_JSON,
            Self::Xml(_) => CONTENT_TYPE_XML,
            Self::Raw(_) => CONTENT_TYPE_OCTET_STREAM,
        }
    }

    /// Wire bytes of this body.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Json(value) => value.to_string().into_bytes(),
            Self::Xml(text) => text.clone().into_bytes(),
            Self::Raw(bytes) => bytes.clone(),
            Self::Base64Raw(bytes) => serde_json::json!({ "content": BASE64.encode(bytes) })
                .to_string()
                .into_bytes(),
        }
    }
}

/// Expected query value: one string, or a sequence for collection formats
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum QueryValue {
    One(String),
    Many(Vec<String>),
}

impl QueryValue {
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::One(v) => std::slice::from_ref(v),
            Self::Many(vs) => vs,
        }
    }
}

impl std::fmt::Display for QueryValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::One(v) => f.write_str(v),
            Self::Many(vs) => write!(f, "{vs:?}"),
        }
    }
}

/// The request a conformant client sends
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RequestSpec {
    /// Query parameters; arrays are sent as repeated keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    /// Non-2xx status the transport must accept instead of rejecting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_status: Option<u16>,
}

impl RequestSpec {
    /// 2xx, or the declared valid status.
    #[must_use]
    pub fn accepts_status(&self, status: u16) -> bool {
        (200..300).contains(&status) || self.valid_status == Some(status)
    }

    /// Whether the request declares `accept: application/json`.
    #[must_use]
    pub fn accepts_json(&self) -> bool {
        self.headers.as_ref().is_some_and(|h| {
            h.iter()
                .any(|(k, v)| k.eq_ignore_ascii_case("accept") && v == CONTENT_TYPE_JSON)
        })
    }

    /// Query parameters flattened to `(key, value)` pairs in key order.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let Some(params) = &self.params else {
            return Vec::new();
        };
        let mut pairs = Vec::new();
        for (key, value) in params {
            match value {
                serde_json::Value::Array(items) => {
                    for item in items {
                        pairs.push((key.clone(), value_to_param_string(item)));
                    }
                }
                other => pairs.push((key.clone(), value_to_param_string(other))),
            }
        }
        pairs
    }

    /// Declared headers as `(name, value)` pairs.
    #[must_use]
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .flatten()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// The response the mock side returns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResponseSpec {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    /// Compared against the server's response body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    /// Returned by the mock side in place of `body`, never compared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock_body: Option<Body>,
}

impl ResponseSpec {
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: None,
            body: None,
            mock_body: None,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_mock_body(mut self, body: Body) -> Self {
        self.mock_body = Some(body);
        self
    }

    /// The body the mock side sends.
    #[must_use]
    pub fn served_body(&self) -> Option<&Body> {
        self.mock_body.as_ref().or(self.body.as_ref())
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }
}

/// One mock-side assertion about an incoming request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum RequestCheck {
    /// Query value has `format` and denotes the same instant as `value`
    QueryDate {
        name: String,
        format: DateFormat,
        value: String,
    },
    /// Query value contained, decoded with `collection_format` if given
    QueryParam {
        name: String,
        value: QueryValue,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        collection_format: Option<CollectionFormat>,
    },
    /// Header value has `format` and denotes the same instant as `value`
    HeaderDate {
        name: String,
        format: DateFormat,
        value: String,
    },
    /// Header present with exactly `value`
    Header { name: String, value: String },
    /// Top-level JSON body field has `format` and denotes the same instant as `value`
    BodyDate {
        field: String,
        format: DateFormat,
        value: String,
    },
    /// JSON body equal to `value`, date strings compared by instant
    CoercedBody { value: serde_json::Value },
    /// XML body structurally equal to `value`
    XmlBody { value: String },
    /// Body bytes exactly `value`
    RawBody {
        #[serde(with = "base64_bytes")]
        #[schemars(with = "String")]
        value: Vec<u8>,
    },
}

/// One HTTP verb's request/response contract within a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MockMethod {
    pub method: HttpVerb,
    #[serde(default)]
    pub request: RequestSpec,
    pub response: ResponseSpec,
    /// Mock-side validation of the incoming request, applied in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<RequestCheck>,
}

/// A named conformance case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scenario {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub kind: ScenarioKind,
    pub mock_methods: Vec<MockMethod>,
}

impl Scenario {
    #[must_use]
    pub fn new(name: impl Into<String>, uri: impl Into<String>, mock_methods: Vec<MockMethod>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            kind: ScenarioKind::default(),
            mock_methods,
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: ScenarioKind) -> Self {
        self.kind = kind;
        self
    }

    /// Only `MockApiDefinition` scenarios are run against a live server.
    #[must_use]
    pub fn is_server_testable(&self) -> bool {
        self.kind != ScenarioKind::MockApi
    }
}

/// A request as received by the mock side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRequest {
    pub method: HttpVerb,
    pub path: String,
    /// Decoded query pairs in source order
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl MockRequest {
    #[must_use]
    pub fn new(method: HttpVerb, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

/// A response synthesized by the mock side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Why the mock side rejected an incoming request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Mismatch(#[from] Mismatch),
}

impl MockMethod {
    #[must_use]
    pub fn new(method: HttpVerb, request: RequestSpec, response: ResponseSpec) -> Self {
        Self {
            method,
            request,
            response,
            checks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_check(mut self, check: RequestCheck) -> Self {
        self.checks.push(check);
        self
    }

    /// The declared request as the mock side would receive it.
    #[must_use]
    pub fn declared_request(&self, path: &str) -> MockRequest {
        MockRequest {
            method: self.method,
            path: path.to_string(),
            query: self.request.query_pairs(),
            headers: self.request.header_pairs(),
            body: self.request.body.as_ref().map(Body::to_bytes).unwrap_or_default(),
        }
    }

    /// Apply every declared check in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for the first check the request violates.
    pub fn validate_request(&self, req: &MockRequest) -> Result<(), ValidationError> {
        self.checks.iter().try_for_each(|check| apply_check(check, req))
    }

    /// The declared response in wire form.
    ///
    /// A `content-type` header is added from the body kind unless one is declared.
    /// `mock_body`, when present, is served instead of `body`.
    #[must_use]
    pub fn build_response(&self, _req: &MockRequest) -> MockResponse {
        let mut headers: Vec<(String, String)> = self
            .response
            .headers
            .iter()
            .flatten()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let body = match self.response.served_body() {
            Some(body) => {
                if find_header(&headers, "content-type").is_none() {
                    headers.push(("content-type".to_string(), body.content_type().to_string()));
                }
                body.to_bytes()
            }
            None => Vec::new(),
        };
        MockResponse {
            status: self.response.status,
            headers,
            body,
        }
    }
}

fn apply_check(check: &RequestCheck, req: &MockRequest) -> Result<(), ValidationError> {
    match check {
        RequestCheck::QueryDate {
            name,
            format,
            value,
        } => {
            let subject = MismatchSubject::QueryParam(name.clone());
            let actual = match query_values(&req.query, name).as_slice() {
                [single] => (*single).to_string(),
                [] => return Err(Mismatch::new(subject, value, "<absent>").into()),
                many => return Err(Mismatch::new(subject, value, format!("{many:?}")).into()),
            };
            check_same_instant(subject, value, &actual, *format)
        }
        RequestCheck::QueryParam {
            name,
            value,
            collection_format,
        } => Ok(check_query_param(&req.query, name, value, *collection_format)?),
        RequestCheck::HeaderDate {
            name,
            format,
            value,
        } => {
            let subject = MismatchSubject::Header(name.clone());
            let actual = find_header(&req.headers, name)
                .ok_or_else(|| Mismatch::new(subject.clone(), value, "<absent>"))?;
            check_same_instant(subject, value, actual, *format)
        }
        RequestCheck::Header { name, value } => Ok(check_header(&req.headers, name, value)?),
        RequestCheck::BodyDate {
            field,
            format,
            value,
        } => {
            let body = parse_json_body(req)?;
            let actual = match body.get(field) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Number(n)) => n.to_string(),
                Some(other) => {
                    return Err(Mismatch::new(MismatchSubject::Body, value, other.to_string())
                        .with_detail(format!("field `{field}` is not a date-time string"))
                        .into());
                }
                None => {
                    return Err(Mismatch::new(MismatchSubject::Body, value, "<absent>")
                        .with_detail(format!("field `{field}` missing"))
                        .into());
                }
            };
            check_same_instant(MismatchSubject::Body, value, &actual, *format)
        }
        RequestCheck::CoercedBody { value } => {
            let body = parse_json_body(req)?;
            Ok(json_equal(value, &body, JsonMode::CoerceDates)?)
        }
        RequestCheck::XmlBody { value } => {
            Ok(xml_equal(value, &String::from_utf8_lossy(&req.body))?)
        }
        RequestCheck::RawBody { value } => {
            if &req.body == value {
                Ok(())
            } else {
                Err(Mismatch::new(
                    MismatchSubject::Body,
                    String::from_utf8_lossy(value),
                    String::from_utf8_lossy(&req.body),
                )
                .into())
            }
        }
    }
}

/// `actual` must be a valid `format` value denoting the instant of `expected`.
fn check_same_instant(
    subject: MismatchSubject,
    expected: &str,
    actual: &str,
    format: DateFormat,
) -> Result<(), ValidationError> {
    let actual_instant = parse_instant(actual, format)?;
    let expected_instant = parse_instant(expected, format)?;
    if actual_instant == expected_instant {
        Ok(())
    } else {
        Err(Mismatch::new(subject, expected, actual)
            .with_detail(format!("different instant ({format})"))
            .into())
    }
}

fn parse_json_body(req: &MockRequest) -> Result<serde_json::Value, Mismatch> {
    serde_json::from_slice(&req.body).map_err(|e| {
        Mismatch::new(
            MismatchSubject::Body,
            "a JSON body",
            String::from_utf8_lossy(&req.body),
        )
        .with_detail(format!("not JSON: {e}"))
    })
}

fn value_to_param_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Raw bytes as base64 strings in fixture files.
mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        BASE64.decode(text.as_bytes()).map_err(serde::de::Error::custom)
    }
}
