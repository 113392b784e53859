//! In-memory stand-in for the remote API.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use huddle_interface::{
    interface::{Transport, TransportError},
    types::{HttpRequest, HttpResponse, Method, UserId},
};
use serde_json::Value;
use std::{collections::HashMap, sync::Mutex};

/// Origin scripted routes are relative to.
pub const BASE_URL: &str = "http://api.test/api/";

#[derive(Clone)]
enum Scripted {
    Respond(HttpResponse),
    Fail,
}

/// Answers requests from a script keyed by verb and path.
///
/// A route keeps serving the last thing scripted for it. Unscripted routes
/// answer 404.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(Method, String), Scripted>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self, method: Method, path: &str, scripted: Scripted) {
        self.routes
            .lock()
            .unwrap()
            .insert((method, path.trim_start_matches('/').to_owned()), scripted);
    }

    pub fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
        self.respond_raw(method, path, status, body.to_string());
    }

    /// Serves `body` verbatim, it does not have to be JSON or even UTF-8.
    pub fn respond_raw(&self, method: Method, path: &str, status: u16, body: impl Into<Vec<u8>>) {
        self.script(
            method,
            path,
            Scripted::Respond(HttpResponse {
                status,
                body: body.into(),
            }),
        );
    }

    /// Makes the route fail before any response is produced.
    pub fn fail(&self, method: Method, path: &str) {
        self.script(method, path, Scripted::Fail);
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        let url = format!("{BASE_URL}{}", path.trim_start_matches('/'));
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.method == method && request.url == url)
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let path = request
            .url
            .strip_prefix(BASE_URL)
            .unwrap_or(&request.url)
            .to_owned();
        let method = request.method;
        self.sent.lock().unwrap().push(request);

        let scripted = self.routes.lock().unwrap().get(&(method, path)).cloned();

        match scripted {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail) => Err(TransportError::new("connection refused")),
            None => Ok(HttpResponse {
                status: 404,
                body: br#"{"detail":"Not found."}"#.to_vec(),
            }),
        }
    }
}

/// Unsigned JWT carrying `user_id`, good enough for client side decoding.
pub fn access_token(user_id: UserId) -> String {
    format!(
        "{}.{}.unsigned",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(format!(r#"{{"token_type":"access","user_id":{user_id}}}"#))
    )
}
