//! Collaborator abstractions.
//!
//! The session layer talks to the outside world only through these traits:
//! durable key/value storage, an HTTP transport, the alert surface and the
//! navigation stack. Backends live in other crates, tests swap in recorders.
use async_trait::async_trait;

use crate::types::{HttpRequest, HttpResponse, Route};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("credential storage is unavailable: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid store key {0:?}")]
    InvalidKey(String),
    #[error("values may not span several lines")]
    InvalidValue,
}

/// Raised when no response reached the client. The outcome of the request is
/// unknown, it may or may not have been applied remotely.
#[derive(Debug, thiserror::Error)]
#[error("transport failure: {reason}")]
pub struct TransportError {
    pub reason: String,
}
impl TransportError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Durable string key/value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Puts a request on the wire and hands back whatever came back.
///
/// Implementations must not interpret status codes, a 500 is still an `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Modal prompts shown to the user.
pub trait Alerts: Send + Sync {
    fn alert(&self, message: &str);
}

/// Navigation stack owned by the presentation layer.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
    fn go_back(&self);
}
