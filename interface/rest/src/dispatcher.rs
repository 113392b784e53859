use huddle_interface::{
    interface::{StoreError, Transport, TransportError},
    types::{HttpRequest, Method},
};
use secure_string::SecureString;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};
use url::Url;

use crate::{jwt::ClaimsError, session::Session};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Nothing came back, the remote state is unknown.
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("cannot resolve endpoint: {0}")]
    Url(#[from] url::ParseError),
    #[error("cannot encode request body: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("no signed in session")]
    NoSession,
    #[error(transparent)]
    Claims(#[from] ClaimsError),
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("response carried no JSON body")]
    Absent,
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("response does not match the expected shape: {0}")]
    Shape(#[from] serde_json::Error),
}

/// Status of a response plus its body, if the body was JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Option<Value>,
}

impl Reply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the body whatever the status was.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        let body = self.body.as_ref().ok_or(DecodeError::Absent)?;
        Ok(serde_json::from_value(body.clone())?)
    }

    /// Decodes the body of a 2xx reply.
    pub fn entity<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        if !self.is_success() {
            return Err(DecodeError::Status(self.status));
        }
        self.decode()
    }
}

/// Issues requests against the API origin, attaching the session's bearer
/// token when there is one.
#[derive(Clone)]
pub struct Dispatcher {
    base: Url,
    transport: Arc<dyn Transport>,
    session: Session,
}

impl Dispatcher {
    pub fn new(mut base: Url, transport: Arc<dyn Transport>, session: Session) -> Self {
        // Without the trailing slash `join` would replace the last segment
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self {
            base,
            transport,
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<Value>,
    ) -> Result<Reply, DispatchError> {
        let token = self.session.access_token().await?;
        self.send(path, method, body, token).await
    }

    /// Like [`Dispatcher::request`] but never sends credentials.
    pub async fn request_public(
        &self,
        path: &str,
        method: Method,
        body: Option<Value>,
    ) -> Result<Reply, DispatchError> {
        self.send(path, method, body, None).await
    }

    async fn send(
        &self,
        path: &str,
        method: Method,
        body: Option<Value>,
        token: Option<SecureString>,
    ) -> Result<Reply, DispatchError> {
        let url = self.base.join(path.trim_start_matches('/'))?;

        let mut headers = vec![("Accept".to_owned(), "application/json".to_owned())];
        if let Some(token) = token {
            headers.push((
                "Authorization".to_owned(),
                format!("Bearer {}", token.unsecure()),
            ));
        }
        let body = body.map(|body| {
            headers.push(("Content-Type".to_owned(), "application/json".to_owned()));
            body.to_string()
        });

        let request = HttpRequest {
            method,
            url: url.to_string(),
            headers,
            body,
        };
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(err) => {
                error!("{method} {path} failed: {err}");
                return Err(err.into());
            }
        };
        debug!("{method} {path} -> {}", response.status);

        let body = match serde_json::from_slice::<Value>(&response.body) {
            Ok(body) => Some(body),
            Err(err) => {
                if !response.body.iter().all(u8::is_ascii_whitespace) {
                    debug!("{method} {path} returned a non JSON body: {err}");
                }
                None
            }
        };

        Ok(Reply {
            status: response.status,
            body,
        })
    }
}
