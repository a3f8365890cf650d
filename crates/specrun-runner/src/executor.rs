//! Scenario executor
//!
//! Runs the selected scenarios against a live server, one mock method at a
//! time, in registry order. The first divergence stops the run.

use std::collections::BTreeMap;
use std::time::Instant;

use specrun_core::compare::{check_header, compare_body, rewrite_pagination_link};
use specrun_core::{
    FailureKind, HttpVerb, LoadError, MethodOutcome, Mismatch, MismatchSubject, MockMethod,
    RunReport, Scenario, ScenarioRegistry, Selection, SelectionError,
};

use crate::transport::{OutgoingRequest, Transport, TransportError, TransportResponse};

/// Longest response body excerpt quoted in a status mismatch
const MAX_BODY_EXCERPT: usize = 512;

/// Why a run stopped
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error("{scenario} ({method}): {source}")]
    Mismatch {
        scenario: String,
        method: HttpVerb,
        #[source]
        source: Mismatch,
    },
    #[error("{scenario} ({method}): {source}")]
    Transport {
        scenario: String,
        method: HttpVerb,
        #[source]
        source: TransportError,
    },
}

impl RunError {
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Load(_) | Self::Selection(_) => FailureKind::Tool,
            Self::Mismatch { .. } => FailureKind::Conformance,
            Self::Transport { .. } => FailureKind::Transport,
        }
    }
}

/// Sequential, fail-fast scenario executor
pub struct Executor<T> {
    transport: T,
    base_path: String,
    headers: BTreeMap<String, String>,
}

impl<T: Transport> Executor<T> {
    /// `base_path` is the server origin; a trailing `/` is dropped.
    #[must_use]
    pub fn new(transport: T, base_path: &str) -> Self {
        Self {
            transport,
            base_path: base_path.trim_end_matches('/').to_string(),
            headers: BTreeMap::new(),
        }
    }

    /// Headers sent with every request. Per-method headers win on conflict.
    #[must_use]
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Run every selected scenario.
    ///
    /// The selection is resolved before the first request is sent.
    ///
    /// # Errors
    ///
    /// Returns the first [`RunError`] encountered; nothing after it runs.
    pub fn run(
        &self,
        registry: &ScenarioRegistry,
        selection: &Selection,
    ) -> Result<RunReport, RunError> {
        let selected = selection.resolve(registry)?;
        let mut report = RunReport::default();

        for scenario in registry.iter() {
            if selected
                .as_ref()
                .is_some_and(|names| !names.contains(&scenario.name))
            {
                continue;
            }
            if !scenario.is_server_testable() {
                tracing::debug!(scenario = %scenario.name, "skipping client-side scenario");
                report.skipped.push(scenario.name.clone());
                continue;
            }
            for method in &scenario.mock_methods {
                let outcome = self.run_method(scenario, method)?;
                report.methods.push(outcome);
            }
            report.scenarios.push(scenario.name.clone());
        }

        tracing::info!(
            scenarios = report.scenarios.len(),
            methods = report.methods.len(),
            skipped = report.skipped.len(),
            "run complete"
        );
        Ok(report)
    }

    fn run_method(&self, scenario: &Scenario, method: &MockMethod) -> Result<MethodOutcome, RunError> {
        tracing::info!(scenario = %scenario.name, method = %method.method, "Executing endpoint");

        let request = self.build_request(scenario, method);
        let start = Instant::now();
        let response = self
            .transport
            .send(&request)
            .map_err(|source| {
                tracing::error!(scenario = %scenario.name, method = %method.method, error = %source, "transport failure");
                RunError::Transport {
                    scenario: scenario.name.clone(),
                    method: method.method,
                    source,
                }
            })?;
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        self.check_response(method, &response).map_err(|source| {
            tracing::error!(
                scenario = %scenario.name,
                method = %method.method,
                expected = %source.expected,
                actual = %source.actual,
                "{} mismatch",
                source.subject
            );
            RunError::Mismatch {
                scenario: scenario.name.clone(),
                method: method.method,
                source,
            }
        })?;

        tracing::debug!(scenario = %scenario.name, method = %method.method, elapsed_ms, "passed");
        Ok(MethodOutcome {
            scenario: scenario.name.clone(),
            method: method.method,
            url: request.url,
            status: response.status,
            elapsed_ms,
        })
    }

    /// Declared query, headers and body. A declared body is forwarded for
    /// every verb, including `get`, `head` and `delete`.
    fn build_request(&self, scenario: &Scenario, method: &MockMethod) -> OutgoingRequest {
        let spec = &method.request;

        let mut headers: BTreeMap<String, String> = self
            .headers
            .iter()
            .filter(|(k, _)| {
                !spec
                    .headers
                    .iter()
                    .flatten()
                    .any(|(declared, _)| declared.eq_ignore_ascii_case(k))
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        headers.extend(spec.header_pairs());

        let body = spec.body.as_ref().map(|body| {
            if method.method.conventionally_bodiless() {
                tracing::debug!(scenario = %scenario.name, method = %method.method, "forwarding declared body");
            }
            if !headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
                headers.insert("content-type".to_string(), body.content_type().to_string());
            }
            body.to_bytes()
        });

        OutgoingRequest {
            method: method.method,
            url: format!("{}{}", self.base_path, scenario.uri),
            query: spec.query_pairs(),
            headers: headers.into_iter().collect(),
            body,
        }
    }

    /// Status, then body, then headers; the first divergence wins.
    fn check_response(&self, method: &MockMethod, response: &TransportResponse) -> Result<(), Mismatch> {
        let expected_status = method.response.status;
        if !method.request.accepts_status(response.status) {
            return Err(status_mismatch(expected_status, response)
                .with_detail(format!(
                    "status outside 2xx and not the declared valid status; body: {}",
                    body_excerpt(&response.body)
                )));
        }
        if response.status != expected_status {
            return Err(status_mismatch(expected_status, response)
                .with_detail(format!("body: {}", body_excerpt(&response.body))));
        }

        if let Some(body) = &method.response.body {
            let expected = rewrite_pagination_link(body, &self.base_path);
            compare_body(&expected, &response.body, method.request.accepts_json())?;
        }

        for (name, value) in method.response.headers.iter().flatten() {
            check_header(&response.headers, name, value)?;
        }
        Ok(())
    }
}

fn status_mismatch(expected: u16, response: &TransportResponse) -> Mismatch {
    Mismatch::new(
        MismatchSubject::Status,
        expected.to_string(),
        response.status.to_string(),
    )
}

fn body_excerpt(body: &[u8]) -> String {
    if body.is_empty() {
        return "<empty>".to_string();
    }
    let text = String::from_utf8_lossy(body);
    if text.len() <= MAX_BODY_EXCERPT {
        return text.into_owned();
    }
    let mut end = MAX_BODY_EXCERPT;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…({} bytes total)", &text[..end], body.len())
}
