//! One blocking HTTP exchange per call.
//!
//! The session manager and resource client talk to the network only through [`Transport`],
//! so the production `ureq` agent can be swapped for a recording fake in tests.

use http::{HeaderMap, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    /// `application/x-www-form-urlencoded`
    Form(Vec<(&'static str, String)>),
    Json(Value),
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Body as text for error messages.
    pub fn body_text(&self) -> String {
        if self.body.is_empty() {
            String::from("<no body>")
        } else {
            String::from_utf8_lossy(&self.body).into_owned()
        }
    }
}

/// The request never produced a response (DNS, connect, TLS, timeout, body read).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError(pub String);

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "transport error: {}", self.0)
    }
}

impl std::error::Error for TransportError {}

pub trait Transport {
    /// Send `request` and wait for the full response. Non-2xx statuses are returned as `Ok`.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build();
        UreqTransport {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

fn with_headers<B>(mut req: ureq::RequestBuilder<B>, headers: &HeaderMap) -> Result<ureq::RequestBuilder<B>, TransportError> {
    req = req.header("Accept", "application/json");
    for (name, value) in headers {
        let value = value
            .to_str()
            .map_err(|e| TransportError(format!("header {} is not visible ASCII: {}", name, e)))?;
        req = req.header(name.as_str(), value);
    }
    Ok(req)
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        let result = match (&request.method, &request.body) {
            (&Method::GET, RequestBody::Empty) => with_headers(self.agent.get(url), &request.headers)?.call(),
            (&Method::DELETE, RequestBody::Empty) => with_headers(self.agent.delete(url), &request.headers)?.call(),
            (&Method::PUT, RequestBody::Json(body)) => with_headers(self.agent.put(url), &request.headers)?.send_json(body),
            (&Method::POST, RequestBody::Form(fields)) => with_headers(self.agent.post(url), &request.headers)?
                .send_form(fields.iter().map(|(k, v)| (*k, v.as_str()))),
            (method, body) => {
                return Err(TransportError(format!(
                    "unsupported request shape: {} with {:?} body",
                    method, body
                )));
            }
        };

        let mut response = result.map_err(|e| TransportError(e.to_string()))?;
        let status = response.status();
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| TransportError(format!("reading response body failed: {}", e)))?;
        Ok(HttpResponse { status, body })
    }
}
