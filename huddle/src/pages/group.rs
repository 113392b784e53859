use async_trait::async_trait;
use futures_locks::RwLock as RwLockAwait;
use huddle_interface::{
    interface::Navigator,
    types::{Group, User, UserId},
};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tracing::{debug, error, warn};

use super::{Binder, entity, require_session};
use crate::{
    alerts::{ONLY_ADMIN, ONLY_ADMIN_CAN_UNBLOCK, SOMETHING_WENT_WRONG},
    context::Context,
    lifecycle::{FocusTicket, Loading, ScreenLifecycle},
};

/// Everything the group screen renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupView {
    pub user: Option<User>,
    pub group_id: Option<String>,
    pub members: Vec<User>,
    pub blocked: Vec<User>,
    pub is_private: bool,
}

impl GroupView {
    /// Members other than the signed in user, in API order.
    pub fn visible_members(&self) -> Vec<&User> {
        let me = self.user.as_ref().map(|user| user.id);
        self.members
            .iter()
            .filter(|member| Some(member.id) != me)
            .collect()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(User::is_admin)
    }
}

/// Group membership screen.
pub struct GroupScreen {
    ctx: Context,
    lifecycle: ScreenLifecycle,
    view: RwLockAwait<GroupView>,
    /// Bumped whenever a focus pass stores the server's privacy flag.
    privacy_refreshes: AtomicU64,
    loading: Loading,
}

impl GroupScreen {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            lifecycle: ScreenLifecycle::default(),
            view: RwLockAwait::new(GroupView::default()),
            privacy_refreshes: AtomicU64::new(0),
            loading: Loading::default(),
        }
    }

    pub async fn view(&self) -> GroupView {
        self.view.read().await.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    /// Applies `update` unless the focus pass went stale meanwhile.
    async fn apply(&self, ticket: &FocusTicket<'_>, update: impl FnOnce(&mut GroupView)) -> bool {
        if !ticket.is_current() {
            return false;
        }
        let mut view = self.view.write().await;
        if !ticket.is_current() {
            return false;
        }
        update(&mut view);
        true
    }

    /// Looks up every blocked id, one request each, keeping the first record
    /// per id.
    async fn blocked_members(&self, ticket: &FocusTicket<'_>, ids: &[UserId]) -> Option<Vec<User>> {
        let mut blocked: Vec<User> = Vec::new();
        for &id in ids {
            let member = entity::<User>("blocked member", self.ctx.api.user(id).await);
            if !ticket.is_current() {
                return None;
            }
            if let Some(member) = member {
                if !blocked.iter().any(|known| known.id == member.id) {
                    blocked.push(member);
                }
            }
        }
        Some(blocked)
    }

    /// Flips the group's privacy. Only admins may; the local flag changes
    /// right away and is restored if the server does not confirm.
    pub async fn toggle_privacy(&self) {
        let (group_id, private) = {
            let view = self.view.read().await;
            if !view.is_admin() {
                drop(view);
                self.ctx.alerts.alert(ONLY_ADMIN);
                return;
            }
            let Some(group_id) = view.group_id.clone() else {
                warn!("No group loaded, cannot change its privacy");
                return;
            };
            (group_id, !view.is_private)
        };

        let optimistic = self.lifecycle.scope().is_mounted();
        if optimistic {
            self.view.write().await.is_private = private;
        }
        let refreshes = self.privacy_refreshes.load(Ordering::SeqCst);
        let _loading = self.loading.begin();

        let confirmed = match self.ctx.api.set_group_privacy(&group_id, private).await {
            Ok(reply) if reply.is_success() => true,
            Ok(reply) => {
                warn!("Privacy change refused with status {}", reply.status);
                false
            }
            Err(err) => {
                error!("Error changing group privacy: {err}");
                false
            }
        };
        if !confirmed {
            if optimistic && self.lifecycle.scope().is_mounted() {
                let mut view = self.view.write().await;
                // Keep what a focus pass fetched in the meantime
                if self.privacy_refreshes.load(Ordering::SeqCst) == refreshes
                    && view.is_private == private
                {
                    view.is_private = !private;
                }
            }
            self.ctx.alerts.alert(SOMETHING_WENT_WRONG);
        }
    }

    /// Gate in front of the unblock prompt. Returns whether the prompt may be
    /// shown.
    pub async fn can_unblock(&self) -> bool {
        if self.view.read().await.is_admin() {
            return true;
        }
        self.ctx.alerts.alert(ONLY_ADMIN_CAN_UNBLOCK);
        false
    }
}

#[async_trait]
impl Binder for GroupScreen {
    fn lifecycle(&self) -> &ScreenLifecycle {
        &self.lifecycle
    }

    fn navigator(&self) -> Arc<dyn Navigator> {
        self.ctx.navigator.clone()
    }

    async fn on_focus(&self) {
        let ticket = self.lifecycle.scope().focus();
        if !ticket.is_current() || !require_session(&self.ctx).await {
            return;
        }
        let _loading = self.loading.begin();

        let user = entity::<User>("user", self.ctx.api.current_user().await);
        let user_group = user.as_ref().and_then(|user| user.group_id.clone());
        if let Some(user) = user {
            if !self.apply(&ticket, |view| view.user = Some(user)).await {
                return;
            }
        }

        let group_id = match user_group {
            Some(group_id) => Some(group_id),
            None => self.ctx.session().group_id().await.unwrap_or_else(|err| {
                error!("Cannot read the stored group: {err}");
                None
            }),
        };
        let Some(group_id) = group_id else {
            debug!("Signed in user has no group");
            return;
        };
        let known = group_id.clone();
        if !self.apply(&ticket, |view| view.group_id = Some(known)).await {
            return;
        }

        let members = entity::<Vec<User>>("members", self.ctx.api.group_members(&group_id).await);
        if let Some(members) = members {
            if !self.apply(&ticket, |view| view.members = members).await {
                return;
            }
        }

        let group = entity::<Group>("group", self.ctx.api.group(&group_id).await);
        let Some(group) = group else {
            return;
        };
        let fresh = self
            .apply(&ticket, |view| {
                view.is_private = group.private;
                self.privacy_refreshes.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        if !fresh {
            return;
        }

        if let Some(blocked) = self.blocked_members(&ticket, &group.users_blacklist).await {
            self.apply(&ticket, |view| view.blocked = blocked).await;
        }
    }
}
