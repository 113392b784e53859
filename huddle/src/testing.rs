//! Recorders and a scripted backend for the flow and screen tests.

use async_trait::async_trait;
use futures::channel::oneshot;
use huddle_interface::{
    interface::{Alerts, KeyValueStore, Navigator, Transport, TransportError},
    types::{HttpRequest, HttpResponse, Route, TokenPair, UserId},
};
use huddle_rest::{
    Api, Dispatcher, MemoryStore, Session,
    testing::{BASE_URL, ScriptedTransport, access_token},
};
use serde_json::{Value, json};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use url::Url;

use crate::context::Context;

#[derive(Default)]
pub struct RecordingAlerts {
    messages: Mutex<Vec<String>>,
}
impl RecordingAlerts {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}
impl Alerts for RecordingAlerts {
    fn alert(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_owned());
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
    back: AtomicUsize,
}
impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }
    pub fn back_presses(&self) -> usize {
        self.back.load(Ordering::SeqCst)
    }
}
impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
    fn go_back(&self) {
        self.back.fetch_add(1, Ordering::SeqCst);
    }
}

type Hook = Box<dyn Fn(&HttpRequest) + Send + Sync>;

type Gate = Arc<Mutex<Option<oneshot::Receiver<()>>>>;

/// Runs a hook before every request reaches the script, and parks the next
/// request while a gate is armed.
struct HookTransport {
    inner: Arc<ScriptedTransport>,
    hook: Arc<Mutex<Option<Hook>>>,
    gate: Gate,
}

#[async_trait]
impl Transport for HookTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        if let Some(hook) = self.hook.lock().unwrap().as_ref() {
            hook(&request);
        }
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.inner.send(request).await
    }
}

pub struct Harness {
    pub transport: Arc<ScriptedTransport>,
    pub store: Arc<MemoryStore>,
    pub alerts: Arc<RecordingAlerts>,
    pub navigator: Arc<RecordingNavigator>,
    pub ctx: Context,
    hook: Arc<Mutex<Option<Hook>>>,
    gate: Gate,
}

impl Harness {
    pub fn new() -> Self {
        let transport = Arc::new(ScriptedTransport::new());
        let store = Arc::new(MemoryStore::new());
        let alerts = Arc::new(RecordingAlerts::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let hook = Arc::new(Mutex::new(None));
        let gate = Arc::new(Mutex::new(None));

        let hooked = Arc::new(HookTransport {
            inner: transport.clone(),
            hook: hook.clone(),
            gate: gate.clone(),
        });
        let dispatcher = Dispatcher::new(
            Url::parse(BASE_URL).unwrap(),
            hooked,
            Session::new(store.clone()),
        );
        let ctx = Context::new(Api::new(dispatcher), alerts.clone(), navigator.clone());

        Self {
            transport,
            store,
            alerts,
            navigator,
            ctx,
            hook,
            gate,
        }
    }

    pub fn on_request(&self, hook: impl Fn(&HttpRequest) + Send + Sync + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    /// Holds the next request until the returned sender fires or is dropped.
    pub fn hold_next_request(&self) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        *self.gate.lock().unwrap() = Some(gate);
        release
    }

    /// Stores a session for `user_id` as a previous login would have.
    pub async fn sign_in(&self, user_id: UserId) {
        self.ctx
            .session()
            .store_tokens(&TokenPair {
                access: access_token(user_id),
                refresh: format!("refresh-{user_id}"),
            })
            .await
            .unwrap();
    }

    pub async fn stored(&self, key: &str) -> Option<String> {
        self.store.get(key).await.unwrap()
    }
}

pub fn user_json(id: UserId, username: &str, group_id: Option<&str>) -> Value {
    json!({
        "id": id,
        "username": username,
        "name": username.to_uppercase(),
        "email": format!("{username}@example.com"),
        "group_id": group_id,
        "admin_of": null
    })
}
