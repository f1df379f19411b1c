use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::DirectoryConfig;
use crate::error::TransportError;
use crate::filter::Filter;
use crate::token::{self, TokenProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Delete,
}

impl Verb {
    fn method(self) -> reqwest::Method {
        match self {
            Verb::Get => reqwest::Method::GET,
            Verb::Post => reqwest::Method::POST,
            Verb::Delete => reqwest::Method::DELETE,
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verb::Get => write!(f, "GET"),
            Verb::Post => write!(f, "POST"),
            Verb::Delete => write!(f, "DELETE"),
        }
    }
}

/// One call against a resource path relative to the directory root.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphRequest {
    pub verb: Verb,
    pub path: String,
    pub filter: Option<Filter>,
    pub body: Option<Value>,
}

impl GraphRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self { verb: Verb::Get, path: path.into(), filter: None, body: None }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self { verb: Verb::Post, path: path.into(), filter: None, body: Some(body) }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self { verb: Verb::Delete, path: path.into(), filter: None, body: None }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Raw answer: status plus body (`Null` when the body was empty, a JSON
/// string when it was not JSON).
#[derive(Debug, Clone, PartialEq)]
pub struct GraphResponse {
    pub status: u16,
    pub body: Value,
}

impl GraphResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The single dependency of the gateway: send one request, return what came
/// back. No retries, no status interpretation.
#[async_trait]
pub trait DirectoryTransport: Send + Sync + 'static {
    async fn send(&self, request: GraphRequest) -> Result<GraphResponse, TransportError>;
}

// ── reqwest ──────────────────────────────────────────────────────────────────

pub struct HttpTransport {
    client: reqwest::Client,
    token: Box<dyn TokenProvider>,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &DirectoryConfig) -> Self {
        let client = reqwest::Client::new();
        let token = token::provider_for(config, client.clone());
        Self {
            client,
            token,
            base_url: config.base_url(),
            timeout: config.timeout,
        }
    }

    /// Transport rooted at `base_url` with an explicit token source.
    pub fn with_token(base_url: impl Into<String>, token: Box<dyn TokenProvider>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[async_trait]
impl DirectoryTransport for HttpTransport {
    async fn send(&self, request: GraphRequest) -> Result<GraphResponse, TransportError> {
        let token = self.token.token().await?;
        let url = format!("{}{}", self.base_url, request.path);
        debug!(verb = %request.verb, url = %url, filter = ?request.filter.as_ref().map(|f| f.to_string()), "Graph request");

        let mut builder = self
            .client
            .request(request.verb.method(), &url)
            .bearer_auth(&token)
            .timeout(self.timeout);
        if let Some(filter) = &request.filter {
            builder = builder.query(&[("$filter", filter.to_string())]);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let request_error = |source: reqwest::Error| TransportError::Request {
            verb: request.verb.to_string(),
            url: url.clone(),
            source,
        };
        let resp = builder.send().await.map_err(request_error)?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes().await.map_err(request_error)?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Ok(GraphResponse { status, body })
    }
}
