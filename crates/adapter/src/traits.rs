use async_trait::async_trait;
use domain::ServerCall;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("{method} {url} failed: {message}")]
    Network {
        method: &'static str,
        url: String,
        message: String,
    },
    #[error("{method} {url} answered with status {status}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
    },
    #[error("unreadable response from {url}: {message}")]
    Body { url: String, message: String },
    #[error("{0}")]
    Other(String),
}

/// The capability the client issues every request through.
///
/// Implementations decide everything about the wire: base URL, cookies,
/// timeouts, retries. An empty response body is reported as `Value::Null`.
#[async_trait(?Send)]
pub trait Transport {
    async fn call(&self, call: ServerCall) -> Result<Value, TransportError>;
}
