//! Executor against a live in-process server
//!
//! Run with: cargo test -p specrun-runner --test server_test

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use specrun_core::{
    Body, FailureKind, HttpVerb, MismatchSubject, MockMethod, MockRequest, MockResponse,
    RequestSpec, ResponseSpec, Scenario, ScenarioRegistry, Selection, Verdict, fixtures,
};
use specrun_runner::{Executor, ReqwestTransport, RunError};

const COMPACT_SIMPLE_MODEL: &str = "<SimpleModel><name>foo</name><age>123</age></SimpleModel>";

fn transport() -> ReqwestTransport {
    ReqwestTransport::new(Some(Duration::from_secs(5))).unwrap()
}

fn only(names: &[&str]) -> ScenarioRegistry {
    let builtin = fixtures::builtin().unwrap();
    let mut builder = ScenarioRegistry::builder();
    for name in names {
        builder
            .register(builtin.get(name).unwrap().clone(), "builtin")
            .unwrap();
    }
    builder.build()
}

/// Same URI and checks as the built-in scenario, but the request sends `value`.
fn unix_query_sending(value: &str) -> Scenario {
    let builtin = fixtures::builtin().unwrap();
    let mut scenario = builtin
        .get("Encode_DateTime_Query_Unix_Timestamp")
        .unwrap()
        .clone();
    scenario.mock_methods[0].request.params =
        Some(BTreeMap::from([("value".to_string(), json!(value))]));
    scenario
}

#[test]
fn builtin_catalogue_passes_against_its_own_mock() {
    let registry = fixtures::builtin().unwrap();
    let base = common::spawn_registry(registry.clone());

    let report = Executor::new(transport(), &base)
        .run(&registry, &Selection::All)
        .unwrap();

    assert_eq!(report.scenarios.len(), registry.len());
    assert_eq!(report.method_count(), 19 + 12 * 2);
    assert!(Verdict::from_report(&report).passed());
}

#[test]
fn unix_timestamp_query_exact_value_passes() {
    let mut builder = ScenarioRegistry::builder();
    builder.register(unix_query_sending("1686566864"), "test").unwrap();
    let registry = builder.build();
    let base = common::spawn_registry(registry.clone());

    let report = Executor::new(transport(), &base)
        .run(&registry, &Selection::All)
        .unwrap();
    assert_eq!(report.methods[0].status, 204);
}

#[test]
fn unix_timestamp_query_rfc3339_value_fails_descriptively() {
    let mut builder = ScenarioRegistry::builder();
    builder
        .register(unix_query_sending("2023-06-12T12:01:04Z"), "test")
        .unwrap();
    let registry = builder.build();
    let base = common::spawn_registry(registry.clone());

    let err = Executor::new(transport(), &base)
        .run(&registry, &Selection::All)
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Conformance);
    let RunError::Mismatch { source, .. } = &err else {
        panic!("expected mismatch, got {err:?}");
    };
    assert_eq!(source.subject, MismatchSubject::Status);
    assert_eq!(source.actual, "400");
    assert!(
        source
            .detail
            .as_deref()
            .unwrap()
            .contains("expected 1686566864 - actual 2023-06-12T12:01:04Z")
    );
}

#[test]
fn xml_get_tolerates_reformatting() {
    let registry = only(&["Payload_Xml_SimpleModel"]);
    let answers = registry.clone();
    let base = common::spawn(Arc::new(move |req: &MockRequest| {
        if req.method == HttpVerb::Get {
            MockResponse {
                status: 200,
                headers: vec![("content-type".into(), "application/xml".into())],
                body: COMPACT_SIMPLE_MODEL.as_bytes().to_vec(),
            }
        } else {
            common::mock_answer(&answers, req)
        }
    }));

    let report = Executor::new(transport(), &base)
        .run(&registry, &Selection::All)
        .unwrap();
    assert_eq!(report.method_count(), 2);
}

#[test]
fn xml_get_with_changed_age_fails() {
    let registry = only(&["Payload_Xml_SimpleModel"]);
    let base = common::spawn(Arc::new(|_: &MockRequest| MockResponse {
        status: 200,
        headers: vec![("content-type".into(), "application/xml".into())],
        body: b"<SimpleModel><name>foo</name><age>124</age></SimpleModel>".to_vec(),
    }));

    let err = Executor::new(transport(), &base)
        .run(&registry, &Selection::All)
        .unwrap_err();
    let RunError::Mismatch { method, source, .. } = &err else {
        panic!("expected mismatch, got {err:?}");
    };
    assert_eq!(*method, HttpVerb::Get);
    assert_eq!(source.subject, MismatchSubject::Body);
    assert_eq!(
        source.detail.as_deref(),
        Some(r#"at /SimpleModel/age[1]: text "123" != "124""#)
    );
}

#[test]
fn xml_put_with_changed_age_rejected_by_mock() {
    let mut scenario = only(&["Payload_Xml_SimpleModel"])
        .get("Payload_Xml_SimpleModel")
        .unwrap()
        .clone();
    let mock = only(&["Payload_Xml_SimpleModel"]);
    scenario.mock_methods.remove(0);
    scenario.mock_methods[0].request.body = Some(Body::xml(
        "<SimpleModel><name>foo</name><age>999</age></SimpleModel>",
    ));
    let mut builder = ScenarioRegistry::builder();
    builder.register(scenario, "test").unwrap();
    let base = common::spawn_registry(mock);

    let err = Executor::new(transport(), &base)
        .run(&builder.build(), &Selection::All)
        .unwrap_err();
    assert!(err.to_string().contains("age[1]"));
}

#[test]
fn selection_file_runs_listed_scenarios_only() {
    let registry = fixtures::builtin().unwrap();
    let base = common::spawn_registry(registry.clone());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenarios.txt");
    std::fs::write(
        &path,
        "Encode_DateTime_Header_Unix_Timestamp   \n\nPayload_Xml_ModelWithText\n",
    )
    .unwrap();

    let report = Executor::new(transport(), &base)
        .run(&registry, &Selection::from_file(&path).unwrap())
        .unwrap();
    assert_eq!(
        report.scenarios,
        vec!["Encode_DateTime_Header_Unix_Timestamp", "Payload_Xml_ModelWithText"]
    );
}

#[test]
fn body_forwarded_on_get() {
    let scenario = Scenario::new(
        "GetWithBody",
        "/get-with-body",
        vec![
            MockMethod::new(
                HttpVerb::Get,
                RequestSpec {
                    body: Some(Body::json(json!({"name": "foo"}))),
                    ..Default::default()
                },
                ResponseSpec::status(200).with_body(Body::json(json!({"ok": true}))),
            )
            .with_check(specrun_core::RequestCheck::CoercedBody {
                value: json!({"name": "foo"}),
            }),
        ],
    );
    let mut builder = ScenarioRegistry::builder();
    builder.register(scenario, "test").unwrap();
    let registry = builder.build();
    let base = common::spawn_registry(registry.clone());

    assert!(
        Executor::new(transport(), &base)
            .run(&registry, &Selection::All)
            .is_ok()
    );
}

#[test]
fn unreachable_server_is_transport_failure() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let registry = only(&["Encode_DateTime_Query_Unix_Timestamp"]);
    let err = Executor::new(transport(), &format!("http://127.0.0.1:{port}"))
        .run(&registry, &Selection::All)
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Transport);
    assert_eq!(Verdict::failed(err.kind(), err.to_string()).exit_code, 2);
}
