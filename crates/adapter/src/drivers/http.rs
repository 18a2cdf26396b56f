use async_trait::async_trait;
use domain::{Method, ServerCall};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::traits::{Transport, TransportError};

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub base_url: String,
    pub timeout: Option<Duration>,
    pub user_agent: Option<String>,
}

impl HttpConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
            user_agent: None,
        }
    }
}

/// Talks to a comment server over HTTP.
///
/// The cookie store is kept for the lifetime of the transport: the server
/// hands out a cookie on creation that later authorizes edits and deletes.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder().cookie_store(true);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.as_str());
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&config.base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn normalize_base_url(url: &str) -> String {
    url.strip_suffix('/').unwrap_or(url).to_string()
}

#[async_trait(?Send)]
impl Transport for HttpTransport {
    async fn call(&self, call: ServerCall) -> Result<Value, TransportError> {
        let endpoint = call.endpoint();
        let method = endpoint.method.as_str();
        let url = format!("{}{}", self.base_url, endpoint.path);

        let mut request = match endpoint.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Delete => self.client.delete(&url),
        };
        if !endpoint.query.is_empty() {
            request = request.query(&endpoint.query);
        }
        if let Some(body) = &endpoint.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| TransportError::Network {
            method,
            url: url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        debug!("{} {} -> {}", method, url, status);
        if !status.is_success() {
            warn!("Comment server rejected {} {}: {}", method, url, status);
            return Err(TransportError::Status {
                method,
                url,
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(|e| TransportError::Network {
            method,
            url: url.clone(),
            message: e.to_string(),
        })?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| TransportError::Body {
            url,
            message: e.to_string(),
        })
    }
}
