use async_trait::async_trait;
use futures_locks::RwLock as RwLockAwait;
use huddle_interface::{interface::Navigator, types::User};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use validator::{Validate, ValidationError, ValidationErrors};

use super::{Binder, entity, require_session};
use crate::{
    alerts::{SOMETHING_WENT_WRONG, rejection_message},
    context::Context,
    lifecycle::{Loading, ScreenLifecycle},
};

const INPUT_LIMIT: usize = 50;

fn within_input_limit(value: &str) -> Result<(), ValidationError> {
    if value.chars().count() > INPUT_LIMIT {
        return Err(ValidationError::new("input_limit"));
    }
    Ok(())
}

/// Editable part of a profile, sent as a partial update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Validate)]
pub struct ProfileForm {
    #[validate(
        length(min = 1, message = "Username is required"),
        custom(function = "within_input_limit", message = "Username is too long")
    )]
    pub username: String,
    #[validate(
        length(min = 1, message = "Name is required"),
        custom(function = "within_input_limit", message = "Name is too long")
    )]
    pub name: String,
    #[validate(
        email(message = "Invalid email"),
        custom(function = "within_input_limit", message = "Email is too long")
    )]
    pub email: String,
}

impl From<&User> for ProfileForm {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug)]
pub enum SaveOutcome {
    /// Client side validation failed, nothing was sent.
    Invalid(ValidationErrors),
    /// Stored remotely, the navigator went back.
    Saved,
    /// The server refused the update with this message.
    Rejected(String),
    Failed,
}

/// Profile editing screen.
pub struct EditProfile {
    ctx: Context,
    lifecycle: ScreenLifecycle,
    user: RwLockAwait<Option<User>>,
    loading: Loading,
}

impl EditProfile {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            lifecycle: ScreenLifecycle::default(),
            user: RwLockAwait::new(None),
            loading: Loading::default(),
        }
    }

    pub async fn is_data_fetched(&self) -> bool {
        self.user.read().await.is_some()
    }

    /// Initial values of the form, once the user is loaded.
    pub async fn initial_form(&self) -> Option<ProfileForm> {
        self.user.read().await.as_ref().map(ProfileForm::from)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    pub async fn save(&self, form: ProfileForm) -> SaveOutcome {
        if let Err(errors) = form.validate() {
            return SaveOutcome::Invalid(errors);
        }
        let _loading = self.loading.begin();

        let reply = match self.ctx.api.patch_current_user(&form).await {
            Ok(reply) => reply,
            Err(err) => {
                error!("Error updating the profile: {err}");
                self.ctx.alerts.alert(SOMETHING_WENT_WRONG);
                return SaveOutcome::Failed;
            }
        };

        match reply.status {
            200..=299 => {
                info!("Profile updated");
                if self.lifecycle.scope().is_mounted() {
                    if let Ok(user) = reply.entity::<User>() {
                        *self.user.write().await = Some(user);
                    }
                    self.ctx.navigator.go_back();
                }
                SaveOutcome::Saved
            }
            400 => {
                let message = rejection_message(&reply);
                self.ctx.alerts.alert(&message);
                SaveOutcome::Rejected(message)
            }
            status => {
                warn!("Profile update answered with status {status}");
                self.ctx.alerts.alert(SOMETHING_WENT_WRONG);
                SaveOutcome::Failed
            }
        }
    }
}

#[async_trait]
impl Binder for EditProfile {
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

        let Some(user) = entity::<User>("user", self.ctx.api.current_user().await) else {
            return;
        };
        let mut slot = self.user.write().await;
        if ticket.is_current() {
            *slot = Some(user);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lifecycle::BackHandler,
        testing::{Harness, user_json},
    };
    use futures::executor::block_on;
    use huddle_interface::types::Method;
    use serde_json::json;

    fn form(username: &str, name: &str, email: &str) -> ProfileForm {
        ProfileForm {
            username: username.into(),
            name: name.into(),
            email: email.into(),
        }
    }

    fn loaded() -> (Harness, EditProfile) {
        let harness = Harness::new();
        block_on(harness.sign_in(6));
        harness
            .transport
            .respond(Method::Get, "core/users/6/", 200, user_json(6, "dan", Some("G1")));
        let screen = EditProfile::new(harness.ctx.clone());
        screen.mount(&BackHandler::new());
        block_on(screen.on_focus());
        (harness, screen)
    }

    #[test]
    fn focus_fills_the_form() {
        let (_harness, screen) = loaded();

        assert!(block_on(screen.is_data_fetched()));
        assert_eq!(
            block_on(screen.initial_form()),
            Some(form("dan", "DAN", "dan@example.com"))
        );
    }

    #[test]
    fn invalid_email_is_caught_before_sending() {
        let (harness, screen) = loaded();
        let before = harness.transport.requests().len();

        let outcome = block_on(screen.save(form("dan", "Dan", "not-an-email")));

        let SaveOutcome::Invalid(errors) = outcome else {
            panic!("invalid email accepted");
        };
        assert!(errors.field_errors().contains_key("email"));
        assert_eq!(harness.transport.requests().len(), before);
    }

    #[test]
    fn blank_and_oversized_fields_are_caught() {
        let (harness, screen) = loaded();

        let outcome = block_on(screen.save(form("", &"n".repeat(51), "dan@example.com")));

        let SaveOutcome::Invalid(errors) = outcome else {
            panic!("invalid form accepted");
        };
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("name"));
        assert!(!fields.contains_key("email"));
        assert_eq!(harness.transport.count(Method::Patch, "core/users/6/"), 0);
    }

    #[test]
    fn saved_profile_goes_back() {
        let (harness, screen) = loaded();
        harness.transport.respond(
            Method::Patch,
            "core/users/6/",
            200,
            user_json(6, "danny", Some("G1")),
        );

        let outcome = block_on(screen.save(form("danny", "DANNY", "danny@example.com")));

        assert!(matches!(outcome, SaveOutcome::Saved));
        assert_eq!(harness.navigator.back_presses(), 1);
        assert!(harness.alerts.messages().is_empty());
        assert!(!screen.is_loading());

        let sent = harness.transport.requests();
        let patch = sent.last().unwrap();
        let body: serde_json::Value = serde_json::from_str(patch.body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({ "username": "danny", "name": "DANNY", "email": "danny@example.com" })
        );
    }

    #[test]
    fn server_rejection_shows_first_field_message() {
        let (harness, screen) = loaded();
        harness.transport.respond(
            Method::Patch,
            "core/users/6/",
            400,
            json!({
                "email": ["user with this email already exists."],
                "name": ["Ensure this field has no more than 40 characters."]
            }),
        );

        let outcome = block_on(screen.save(form("dan", "Dan", "taken@example.com")));

        let SaveOutcome::Rejected(message) = outcome else {
            panic!("rejection not reported");
        };
        assert_eq!(message, "Ensure this field has no more than 40 characters.");
        assert_eq!(harness.alerts.messages(), vec![message]);
        assert_eq!(harness.navigator.back_presses(), 0);
        assert!(!screen.is_loading());
    }

    #[test]
    fn unreachable_server_is_a_generic_failure() {
        let (harness, screen) = loaded();
        harness.transport.fail(Method::Patch, "core/users/6/");

        let outcome = block_on(screen.save(form("dan", "Dan", "dan@example.com")));

        assert!(matches!(outcome, SaveOutcome::Failed));
        assert_eq!(harness.alerts.messages(), vec![SOMETHING_WENT_WRONG]);
        assert!(!screen.is_loading());
    }

    #[test]
    fn server_error_is_a_generic_failure() {
        let (harness, screen) = loaded();
        harness
            .transport
            .respond_raw(Method::Patch, "core/users/6/", 500, "Internal Server Error");

        let outcome = block_on(screen.save(form("dan", "Dan", "dan@example.com")));

        assert!(matches!(outcome, SaveOutcome::Failed));
        assert_eq!(harness.alerts.messages(), vec![SOMETHING_WENT_WRONG]);
    }

    #[test]
    fn nothing_is_shown_when_the_user_cannot_be_loaded() {
        let harness = Harness::new();
        block_on(harness.sign_in(6));
        harness.transport.fail(Method::Get, "core/users/6/");
        let screen = EditProfile::new(harness.ctx.clone());
        screen.mount(&BackHandler::new());

        block_on(screen.on_focus());

        assert!(!block_on(screen.is_data_fetched()));
        assert!(harness.alerts.messages().is_empty());
    }
}
