//! `Encode_DateTime_*`: date-time values in query, body, header and response header

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::format::{CollectionFormat, DateFormat};
use crate::scenario::{
    Body, HttpVerb, MockMethod, QueryValue, RequestCheck, RequestSpec, ResponseSpec, Scenario,
    ScenarioKind,
};

const RFC3339_VALUE: &str = "2022-08-26T18:38:00.000Z";
const RFC7231_VALUE: &str = "Fri, 26 Aug 2022 14:38:00 GMT";
const UNIX_VALUE: i64 = 1_686_566_864;
const UNIX_ARRAY: [i64; 2] = [1_686_566_864, 1_686_734_256];

/// How the mock side judges the transmitted value
enum Expect {
    /// Valid `format` value denoting the same instant
    Date(DateFormat, &'static str),
    /// Exact value
    Exact,
}

pub(super) fn scenarios() -> Vec<Scenario> {
    let unix_csv = UNIX_ARRAY.map(|v| v.to_string()).join(",");
    vec![
        query(
            "Encode_DateTime_Query_Default_Server_Test",
            "default",
            json!(RFC3339_VALUE),
            Expect::Date(DateFormat::Rfc3339, RFC3339_VALUE),
        ),
        query(
            "Encode_DateTime_Query_rfc3339_Server_Test",
            "rfc3339",
            json!(RFC3339_VALUE),
            Expect::Date(DateFormat::Rfc3339, RFC3339_VALUE),
        ),
        query(
            "Encode_DateTime_Query_rfc7231_Server_Test",
            "rfc7231",
            json!(RFC7231_VALUE),
            Expect::Date(DateFormat::Rfc7231, RFC7231_VALUE),
        ),
        query(
            "Encode_DateTime_Query_Unix_Timestamp",
            "unix-timestamp",
            json!(UNIX_VALUE),
            Expect::Exact,
        ),
        query(
            "Encode_DateTime_Query_Unix_Timestamp_Array",
            "unix-timestamp-array",
            json!(unix_csv),
            Expect::Exact,
        ),
        property(
            "Encode_DateTime_Property_Default_Server_Test",
            "default",
            json!(RFC3339_VALUE),
            Expect::Date(DateFormat::Rfc3339, RFC3339_VALUE),
        ),
        property(
            "Encode_DateTime_Property_rfc3339_Server_Test",
            "rfc3339",
            json!(RFC3339_VALUE),
            Expect::Date(DateFormat::Rfc3339, RFC3339_VALUE),
        ),
        property(
            "Encode_DateTime_Property_rfc7231_Server_Test",
            "rfc7231",
            json!(RFC7231_VALUE),
            Expect::Date(DateFormat::Rfc7231, RFC7231_VALUE),
        ),
        property(
            "Encode_DateTime_Property_Unix_Timestamp",
            "unix-timestamp",
            json!(UNIX_VALUE),
            Expect::Exact,
        ),
        property(
            "Encode_DateTime_Property_Unix_Timestamp_Array",
            "unix-timestamp-array",
            json!(UNIX_ARRAY),
            Expect::Exact,
        ),
        header(
            "Encode_DateTime_Header_Default_Server_Test",
            "default",
            RFC7231_VALUE,
            Expect::Date(DateFormat::Rfc7231, RFC7231_VALUE),
        ),
        header(
            "Encode_DateTime_Header_rfc3339_Server_Test",
            "rfc3339",
            RFC3339_VALUE,
            Expect::Date(DateFormat::Rfc3339, RFC3339_VALUE),
        ),
        header(
            "Encode_DateTime_Header_rfc7231_Server_Test",
            "rfc7231",
            RFC7231_VALUE,
            Expect::Date(DateFormat::Rfc7231, RFC7231_VALUE),
        ),
        header(
            "Encode_DateTime_Header_Unix_Timestamp",
            "unix-timestamp",
            &UNIX_VALUE.to_string(),
            Expect::Exact,
        ),
        header(
            "Encode_DateTime_Header_Unix_Timestamp_Array",
            "unix-timestamp-array",
            &unix_csv,
            Expect::Exact,
        ),
        response_header(
            "Encode_DateTime_ResponseHeader_Default_Server_Test",
            "default",
            RFC7231_VALUE,
        ),
        response_header(
            "Encode_DateTime_ResponseHeader_rfc3339_Server_Test",
            "rfc3339",
            RFC3339_VALUE,
        ),
        response_header(
            "Encode_DateTime_ResponseHeader_rfc7231_Server_Test",
            "rfc7231",
            RFC7231_VALUE,
        ),
        response_header(
            "Encode_DateTime_ResponseHeader_Unix_Timestamp",
            "unix-timestamp",
            &UNIX_VALUE.to_string(),
        ),
    ]
}

fn definition(name: &str, uri: String, method: MockMethod) -> Scenario {
    Scenario::new(name, uri, vec![method]).with_kind(ScenarioKind::MockApiDefinition)
}

fn query(name: &str, suffix: &str, value: Value, expect: Expect) -> Scenario {
    let check = match expect {
        Expect::Date(format, expected) => RequestCheck::QueryDate {
            name: "value".into(),
            format,
            value: expected.into(),
        },
        Expect::Exact => match &value {
            Value::String(s) if s.contains(',') => RequestCheck::QueryParam {
                name: "value".into(),
                value: QueryValue::Many(s.split(',').map(str::to_string).collect()),
                collection_format: Some(CollectionFormat::Csv),
            },
            Value::String(s) => RequestCheck::QueryParam {
                name: "value".into(),
                value: QueryValue::One(s.clone()),
                collection_format: None,
            },
            other => RequestCheck::QueryParam {
                name: "value".into(),
                value: QueryValue::One(other.to_string()),
                collection_format: None,
            },
        },
    };
    let request = RequestSpec {
        params: Some(BTreeMap::from([("value".to_string(), value)])),
        ..Default::default()
    };
    definition(
        name,
        format!("/encode/datetime/query/{suffix}"),
        MockMethod::new(HttpVerb::Get, request, ResponseSpec::status(204)).with_check(check),
    )
}

fn property(name: &str, suffix: &str, value: Value, expect: Expect) -> Scenario {
    let check = match expect {
        Expect::Date(format, expected) => RequestCheck::BodyDate {
            field: "value".into(),
            format,
            value: expected.into(),
        },
        Expect::Exact => RequestCheck::CoercedBody {
            value: json!({ "value": value }),
        },
    };
    let request = RequestSpec {
        body: Some(Body::json(json!({ "value": value }))),
        ..Default::default()
    };
    let response = ResponseSpec::status(200).with_mock_body(Body::json(json!({ "value": value })));
    definition(
        name,
        format!("/encode/datetime/property/{suffix}"),
        MockMethod::new(HttpVerb::Post, request, response).with_check(check),
    )
}

fn header(name: &str, suffix: &str, value: &str, expect: Expect) -> Scenario {
    let check = match expect {
        Expect::Date(format, expected) => RequestCheck::HeaderDate {
            name: "value".into(),
            format,
            value: expected.into(),
        },
        Expect::Exact => RequestCheck::Header {
            name: "value".into(),
            value: value.into(),
        },
    };
    let request = RequestSpec {
        headers: Some(BTreeMap::from([("value".to_string(), value.to_string())])),
        ..Default::default()
    };
    definition(
        name,
        format!("/encode/datetime/header/{suffix}"),
        MockMethod::new(HttpVerb::Get, request, ResponseSpec::status(204)).with_check(check),
    )
}

fn response_header(name: &str, suffix: &str, value: &str) -> Scenario {
    definition(
        name,
        format!("/encode/datetime/responseheader/{suffix}"),
        MockMethod::new(
            HttpVerb::Get,
            RequestSpec::default(),
            ResponseSpec::status(204).with_header("value", value),
        ),
    )
}
