//! Authenticated, retrying client for the remote document API.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;

use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::records::RemoteDocument;

/// Connectivity check endpoint.
pub const PING_PATH: &str = "/api/method/frappe.ping";

const COUNT_FIELDS: &str = r#"["count(name) as total"]"#;

/// Path of a doctype's collection, e.g. `/api/resource/Academic%20Year`.
pub fn resource_path(doctype: &str) -> String {
    format!("/api/resource/{}", urlencoding::encode(doctype))
}

/// Path of a single document.
pub fn document_path(doctype: &str, name: &str) -> String {
    format!(
        "/api/resource/{}/{}",
        urlencoding::encode(doctype),
        urlencoding::encode(name)
    )
}

/// Path of the count query for a doctype.
pub fn count_path(doctype: &str) -> String {
    format!(
        "{}?fields={}",
        resource_path(doctype),
        urlencoding::encode(COUNT_FIELDS)
    )
}

/// Client for the remote document API.
///
/// The Basic credential header is encoded once at construction and sent with
/// every request. No local state is touched by any call.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: Client,
    base_url: String,
    retry_attempts: u32,
    retry_delay: Duration,
    strict_existence_check: bool,
}

impl RemoteClient {
    /// Builds a client from configuration.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        match &config.credentials {
            Some(creds) => {
                let encoded = STANDARD.encode(format!("{}:{}", creds.api_key, creds.api_secret));
                let mut value = HeaderValue::from_str(&format!("Basic {}", encoded))
                    .map_err(|e| RemoteError::Client(e.to_string()))?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            None => {
                tracing::warn!("No remote credentials configured, requests will be unauthenticated");
            }
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| RemoteError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry_attempts: config.retry_attempts.max(1),
            retry_delay: config.retry_delay,
            strict_existence_check: config.strict_existence_check,
        })
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Performs one logical call, retrying failed attempts.
    ///
    /// At most `retry_attempts` requests are sent, with `retry_delay` between
    /// them. After the last attempt the last error is returned as-is.
    pub async fn execute(
        &self,
        method: Method,
        resource_path: &str,
        body: Option<&Value>,
    ) -> Result<Value, RemoteError> {
        let mut attempt = 1;
        loop {
            match self.send_once(method.clone(), resource_path, body).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.retry_attempts => {
                    tracing::warn!(
                        "{} {} failed: {}; retrying ({}/{})",
                        method,
                        resource_path,
                        e,
                        attempt,
                        self.retry_attempts
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::debug!(
                        "{} {} failed after {} attempt(s): {}",
                        method,
                        resource_path,
                        attempt,
                        e
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Checks whether a document exists.
    ///
    /// In lenient mode any failure reads as "absent". In strict mode only a
    /// 404 does; other failures are returned to the caller.
    pub async fn exists(&self, doctype: &str, name: &str) -> Result<bool, RemoteError> {
        match self
            .execute(Method::GET, &document_path(doctype, name), None)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() || !self.strict_existence_check => {
                tracing::debug!("{} {} treated as absent: {}", doctype, name, e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Creates a document.
    pub async fn create(&self, doc: &RemoteDocument) -> Result<Value, RemoteError> {
        let body = doc.to_body();
        self.execute(Method::POST, &resource_path(doc.doctype()), Some(&body))
            .await
    }

    /// Overwrites an existing document.
    pub async fn update(&self, doc: &RemoteDocument) -> Result<Value, RemoteError> {
        let body = doc.to_body();
        self.execute(
            Method::PUT,
            &document_path(doc.doctype(), doc.name()),
            Some(&body),
        )
        .await
    }

    /// Returns the number of documents of a doctype.
    pub async fn count(&self, doctype: &str) -> Result<u64, RemoteError> {
        let response = self.execute(Method::GET, &count_path(doctype), None).await?;
        parse_count(&response)
    }

    /// Single-attempt connectivity check.
    pub async fn ping(&self) -> bool {
        match self.send_once(Method::GET, PING_PATH, None).await {
            Ok(value) => value.get("message").and_then(Value::as_str) == Some("pong"),
            Err(e) => {
                tracing::debug!("Ping failed: {}", e);
                false
            }
        }
    }

    async fn send_once(
        &self,
        method: Method,
        resource_path: &str,
        body: Option<&Value>,
    ) -> Result<Value, RemoteError> {
        let url = format!("{}{}", self.base_url, resource_path);
        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(RemoteError::Rejection {
                status: status.as_u16(),
                message: rejection_message(status, &bytes),
            });
        }

        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

/// Extracts a human-readable reason from an error response body.
fn rejection_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        for key in ["message", "exception", "exc_type"] {
            match value.get(key) {
                Some(Value::String(s)) if !s.is_empty() => return s.clone(),
                Some(Value::Null) | None => {}
                Some(Value::String(_)) => {}
                Some(other) => return other.to_string(),
            }
        }
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string())
}

/// Reads `data[0].total`, which the remote may send as a number or a string.
fn parse_count(response: &Value) -> Result<u64, RemoteError> {
    let total = match response.pointer("/data/0/total") {
        None | Some(Value::Null) => return Ok(0),
        Some(total) => total,
    };
    match total {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .ok_or_else(|| RemoteError::Decode(format!("invalid count: {}", n))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| RemoteError::Decode(format!("invalid count: {}", s))),
        other => Err(RemoteError::Decode(format!("invalid count: {}", other))),
    }
}
