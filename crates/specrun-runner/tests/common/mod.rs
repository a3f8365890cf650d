//! In-process HTTP/1.1 mock server for executor integration tests
//!
//! Answers each request from a scenario registry: the matching mock method's
//! `validate_request` judges the request (400 with the error text on failure),
//! then `build_response` produces the reply. One connection per request.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;

use specrun_core::{HttpVerb, MockRequest, MockResponse, ScenarioRegistry};

pub type Handler = dyn Fn(&MockRequest) -> MockResponse + Send + Sync;

/// Spawn a server on an ephemeral port; returns its base path.
pub fn spawn(handler: Arc<Handler>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { continue };
            let handler = Arc::clone(&handler);
            std::thread::spawn(move || serve(stream, &*handler));
        }
    });
    format!("http://{addr}")
}

/// Mock server built from the scenarios themselves.
pub fn spawn_registry(registry: ScenarioRegistry) -> String {
    spawn(Arc::new(move |req: &MockRequest| mock_answer(&registry, req)))
}

pub fn mock_answer(registry: &ScenarioRegistry, req: &MockRequest) -> MockResponse {
    let method = registry
        .iter()
        .filter(|s| s.uri == req.path)
        .flat_map(|s| &s.mock_methods)
        .find(|m| m.method == req.method);
    match method {
        None => text_response(404, format!("no mock for {} {}", req.method, req.path)),
        Some(method) => match method.validate_request(req) {
            Ok(()) => method.build_response(req),
            Err(e) => text_response(400, e.to_string()),
        },
    }
}

pub fn text_response(status: u16, text: String) -> MockResponse {
    MockResponse {
        status,
        headers: vec![("content-type".into(), "text/plain".into())],
        body: text.into_bytes(),
    }
}

fn serve(stream: TcpStream, handler: &Handler) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());

    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();
    let mut parts = request_line.split_whitespace();
    let verb = parts.next().unwrap_or_default();
    let target = parts.next().unwrap_or("/").to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((k, v)) = line.split_once(':') {
            headers.push((k.trim().to_string(), v.trim().to_string()));
        }
    }

    let length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0; length];
    reader.read_exact(&mut body).unwrap();

    let url = reqwest::Url::parse(&format!("http://localhost{target}")).unwrap();
    let req = MockRequest {
        method: parse_verb(verb),
        path: url.path().to_string(),
        query: url.query_pairs().into_owned().collect(),
        headers,
        body,
    };

    let resp = handler(&req);
    write_response(stream, &resp);
}

fn parse_verb(verb: &str) -> HttpVerb {
    serde_json::from_value(serde_json::Value::String(verb.to_ascii_lowercase())).unwrap()
}

fn write_response(mut stream: TcpStream, resp: &MockResponse) {
    let mut head = format!("HTTP/1.1 {} Mock\r\n", resp.status);
    for (k, v) in &resp.headers {
        head.push_str(&format!("{k}: {v}\r\n"));
    }
    head.push_str(&format!(
        "content-length: {}\r\nconnection: close\r\n\r\n",
        resp.body.len()
    ));
    stream.write_all(head.as_bytes()).unwrap();
    stream.write_all(&resp.body).unwrap();
    stream.flush().unwrap();
}
