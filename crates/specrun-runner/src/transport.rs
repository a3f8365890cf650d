//! HTTP transport seam
//!
//! The executor talks to the server through [`Transport`]. The transport only
//! moves bytes: it never judges status codes, retries, or decodes bodies.

use std::time::Duration;

use specrun_core::HttpVerb;

/// A fully built request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest {
    pub method: HttpVerb,
    pub url: String,
    /// Appended to the URL in order; repeated keys allowed
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

/// What came back, whatever the status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    /// Header names as received (reqwest lowercases them)
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Cannot build HTTP client: {0}")]
    Client(String),
    #[error("Invalid header `{0}`")]
    InvalidHeader(String),
    #[error("Request to {0} timed out")]
    Timeout(String),
    #[error("Request to {0} failed: {1}")]
    Request(String, String),
}

/// One blocking request/response round trip.
pub trait Transport {
    /// # Errors
    ///
    /// Returns [`TransportError`] when no response was received.
    fn send(&self, request: &OutgoingRequest) -> Result<TransportResponse, TransportError>;
}

/// Blocking `reqwest` transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// `timeout` of `None` keeps reqwest's default.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] if the client cannot be built.
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &OutgoingRequest) -> Result<TransportResponse, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| TransportError::Request(request.url.clone(), e.to_string()))?;

        let mut req = self.client.request(method, &request.url);
        for (k, v) in &request.headers {
            if reqwest::header::HeaderValue::from_str(v).is_err() {
                return Err(TransportError::InvalidHeader(k.clone()));
            }
            req = req.header(k, v);
        }
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        if let Some(body) = &request.body {
            req = req.body(body.clone());
        }

        let resp = req.send().map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(request.url.clone())
            } else {
                TransportError::Request(request.url.clone(), e.to_string())
            }
        })?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = resp
            .bytes()
            .map_err(|e| TransportError::Request(request.url.clone(), e.to_string()))?
            .to_vec();

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_refused_is_request_error() {
        // Bind then drop to get a port nothing listens on.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let transport = ReqwestTransport::new(Some(Duration::from_secs(2))).unwrap();
        let request = OutgoingRequest {
            method: HttpVerb::Get,
            url: format!("http://127.0.0.1:{port}/x"),
            query: vec![],
            headers: vec![],
            body: None,
        };
        let err = transport.send(&request).unwrap_err();
        assert!(matches!(err, TransportError::Request(ref url, _) if url.ends_with("/x")));
    }

    #[test]
    fn invalid_header_value_rejected_before_send() {
        let transport = ReqwestTransport::new(None).unwrap();
        let request = OutgoingRequest {
            method: HttpVerb::Get,
            url: "http://127.0.0.1:9/".into(),
            query: vec![],
            headers: vec![("x-bad".into(), "a\r\nb".into())],
            body: None,
        };
        assert_eq!(
            transport.send(&request).unwrap_err(),
            TransportError::InvalidHeader("x-bad".into())
        );
    }
}
