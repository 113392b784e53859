use huddle_interface::interface::{Alerts, Navigator};
use huddle_rest::{Api, Session};
use std::sync::Arc;

/// Collaborators every flow and screen works with.
#[derive(Clone)]
pub struct Context {
    pub api: Api,
    pub alerts: Arc<dyn Alerts>,
    pub navigator: Arc<dyn Navigator>,
}

impl Context {
    pub fn new(api: Api, alerts: Arc<dyn Alerts>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            api,
            alerts,
            navigator,
        }
    }

    pub fn session(&self) -> &Session {
        self.api.session()
    }
}
