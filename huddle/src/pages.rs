//! Flow and screen controllers. Each one owns the state its view renders and
//! reloads it on every focus.

pub mod edit_profile;
pub mod group;
pub mod login;

use async_trait::async_trait;
use huddle_interface::{interface::Navigator, types::Route};
use huddle_rest::{DispatchError, Reply};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{error, warn};

use crate::{
    context::Context,
    lifecycle::{BackHandler, ScreenLifecycle},
};
pub use edit_profile::EditProfile;
pub use group::GroupScreen;
pub use login::Login;

/// A screen whose data is pulled from the API whenever it becomes visible.
#[async_trait]
pub trait Binder: Send + Sync {
    fn lifecycle(&self) -> &ScreenLifecycle;
    fn navigator(&self) -> Arc<dyn Navigator>;

    /// Registers the screen's back listener. Results of focus passes are only
    /// applied while mounted.
    fn mount(&self, back_handler: &BackHandler) {
        self.lifecycle().mount(back_handler, self.navigator());
    }

    fn unmount(&self) {
        self.lifecycle().unmount();
    }

    /// Full resynchronisation with the API.
    async fn on_focus(&self);
}

/// Sends the user to the login screen when nobody is signed in.
async fn require_session(ctx: &Context) -> bool {
    match ctx.session().current().await {
        Ok(Some(_)) => true,
        Ok(None) => {
            ctx.navigator.navigate(Route::Login);
            false
        }
        Err(err) => {
            error!("Cannot read the session: {err}");
            false
        }
    }
}

/// Entity carried by a successful reply. Failures are logged and read as
/// "nothing to show".
fn entity<T: DeserializeOwned>(what: &str, reply: Result<Reply, DispatchError>) -> Option<T> {
    match reply.map(|reply| reply.entity::<T>()) {
        Ok(Ok(entity)) => Some(entity),
        Ok(Err(err)) => {
            warn!("Ignoring {what}: {err}");
            None
        }
        Err(err) => {
            error!("Error fetching {what}: {err}");
            None
        }
    }
}
