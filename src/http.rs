//! HTTP seam between the checks and the backend under test.
//!
//! Checks only see [`Transport`]; the production implementation wraps a
//! reqwest client carrying the fixed JSON headers and the base URL.

use std::error::Error as _;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use serde_json::Value;

use crate::types::Fault;

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the base URL, e.g. `/dogs` or `""` for the root.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout: Duration,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>, timeout: Duration) -> Self {
        ApiRequest {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
            timeout,
        }
    }

    pub fn post(path: impl Into<String>, body: Option<Value>, timeout: Duration) -> Self {
        ApiRequest {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body,
            timeout,
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Short form used in fault messages, e.g. `GET /dogs?size=mediano`.
    pub fn label(&self) -> String {
        let path = if self.path.is_empty() { "/" } else { self.path.as_str() };
        if self.query.is_empty() {
            return format!("{} {}", self.method, path);
        }
        let query: Vec<String> = self.query.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{} {}?{}", self.method, path, query.join("&"))
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// `METHOD /path` of the request that produced this response.
    pub request: String,
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(request: &ApiRequest, status: u16, body: impl Into<String>) -> Self {
        ApiResponse {
            request: request.label(),
            status,
            body: body.into(),
        }
    }

    /// Fail with [`Fault::Status`] unless the status code is exactly `expected`.
    pub fn expect_status(self, expected: u16) -> Result<Self, Fault> {
        if self.status == expected {
            Ok(self)
        } else {
            Err(Fault::Status {
                request: self.request,
                expected,
                actual: self.status,
                body: self.body,
            })
        }
    }

    pub fn json(&self) -> Result<Value, Fault> {
        serde_json::from_str(&self.body).map_err(|e| Fault::Shape {
            detail: format!("Malformed JSON body: {e}"),
            payload: Value::String(self.body.clone()),
        })
    }

    /// Status check followed by JSON decoding, the common path for every check.
    pub fn expect_json(self, expected: u16) -> Result<Value, Fault> {
        self.expect_status(expected)?.json()
    }
}

/// Executes one request against the backend. Faults below HTTP (refused
/// connections, timeouts) come back as [`Fault::Transport`], never as panics.
pub trait Transport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Fault>;
}

pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(HttpTransport {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Fault> {
        let url = self.url(&request.path);
        let start = Instant::now();

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .timeout(request.timeout);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(method = %request.method, %url, "request failed: {}", describe(&e, request.timeout));
            Fault::Transport(describe(&e, request.timeout))
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Fault::Transport(describe(&e, request.timeout)))?;

        tracing::debug!(
            method = %request.method,
            %url,
            status,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "response received"
        );

        Ok(ApiResponse::new(&request, status, body))
    }
}

/// Flatten a reqwest error and its sources into one line.
fn describe(err: &reqwest::Error, timeout: Duration) -> String {
    if err.is_timeout() {
        return format!("timed out after {}s", timeout.as_secs());
    }
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FaultKind;
    use serde_json::json;

    #[test]
    fn test_url_joins_base_and_path() {
        let transport = HttpTransport::new("http://localhost:3000/api/").unwrap();
        assert_eq!(transport.url(""), "http://localhost:3000/api");
        assert_eq!(transport.url("/dogs"), "http://localhost:3000/api/dogs");
    }

    #[test]
    fn test_request_builders() {
        let req = ApiRequest::get("/dogs", Duration::from_secs(10))
            .query("size", "mediano")
            .query("urgent", true);
        assert_eq!(req.method, Method::GET);
        assert_eq!(
            req.query,
            vec![
                ("size".to_string(), "mediano".to_string()),
                ("urgent".to_string(), "true".to_string())
            ]
        );
        assert_eq!(req.label(), "GET /dogs?size=mediano&urgent=true");
        let post = ApiRequest::post("/dogs", Some(json!({"title": "x"})), Duration::from_secs(15));
        assert_eq!(post.method, Method::POST);
        assert!(post.body.is_some());
        assert_eq!(ApiRequest::get("", Duration::from_secs(10)).label(), "GET /");
    }

    #[test]
    fn test_expect_json_rejects_wrong_status() {
        let req = ApiRequest::get("/provinces", Duration::from_secs(10));
        let resp = ApiResponse::new(&req, 500, r#"{"error":"Failed"}"#);
        let err = resp.expect_json(200).unwrap_err();
        assert_eq!(err.kind(), FaultKind::Status);
        assert!(err.to_string().starts_with("GET /provinces: expected HTTP 200, got HTTP 500"));
    }

    #[test]
    fn test_expect_json_rejects_malformed_body() {
        let req = ApiRequest::get("", Duration::from_secs(10));
        let resp = ApiResponse::new(&req, 200, "<html>");
        let err = resp.expect_json(200).unwrap_err();
        assert_eq!(err.kind(), FaultKind::Shape);
        assert!(err.to_string().starts_with("Malformed JSON body"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_fault() {
        // Port 1 is reserved and refuses connections on loopback.
        let transport = HttpTransport::new("http://127.0.0.1:1/api").unwrap();
        let err = transport
            .send(ApiRequest::get("", Duration::from_secs(2)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FaultKind::Transport);
    }

    #[tokio::test]
    async fn test_silent_backend_is_timeout_fault() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept connections and hold them open without ever answering.
        let _server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let transport = HttpTransport::new(&format!("http://{addr}/api")).unwrap();
        let err = transport
            .send(ApiRequest::get("", Duration::from_secs(1)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FaultKind::Transport);
        assert_eq!(err.to_string(), "Request failed: timed out after 1s");
    }
}
