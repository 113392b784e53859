use huddle_interface::{
    interface::StoreError,
    types::{Route, TokenPair, User},
};
use huddle_rest::{DecodeError, DispatchError};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};
use validator::{Validate, ValidationErrors};

use crate::{
    alerts::{INVALID_CREDENTIALS, SOMETHING_WENT_WRONG},
    context::Context,
    lifecycle::{Loading, LoadingGuard},
};

#[derive(Debug, Clone, Default, Validate)]
pub struct LoginForm {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginState {
    #[default]
    Idle,
    Submitting,
}

#[derive(Debug)]
pub enum LoginOutcome {
    /// The form did not pass validation, nothing was sent.
    Invalid(ValidationErrors),
    /// Another submission is still running.
    Busy,
    /// Signed in, the navigator was sent to the returned route.
    Success(Route),
    InvalidCredentials,
    Failure,
}

#[derive(Debug, thiserror::Error)]
enum LoginError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("cannot persist credentials: {0}")]
    Store(#[from] StoreError),
    #[error("unusable profile: {0}")]
    Profile(#[from] DecodeError),
}

/// Puts the flow back to idle however the submission ends.
struct Submission<'a> {
    submitting: &'a AtomicBool,
    _loading: LoadingGuard<'a>,
}
impl Drop for Submission<'_> {
    fn drop(&mut self) {
        self.submitting.store(false, Ordering::SeqCst);
    }
}

/// Login flow: trades credentials for a token pair and routes the user
/// depending on their group membership.
pub struct Login {
    ctx: Context,
    submitting: AtomicBool,
    loading: Loading,
}

impl Login {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            submitting: AtomicBool::new(false),
            loading: Loading::default(),
        }
    }

    pub fn state(&self) -> LoginState {
        match self.submitting.load(Ordering::SeqCst) {
            true => LoginState::Submitting,
            false => LoginState::Idle,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    fn begin(&self) -> Option<Submission<'_>> {
        self.submitting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        Some(Submission {
            submitting: &self.submitting,
            _loading: self.loading.begin(),
        })
    }

    pub async fn submit(&self, form: LoginForm) -> LoginOutcome {
        if let Err(errors) = form.validate() {
            return LoginOutcome::Invalid(errors);
        }
        let Some(_submission) = self.begin() else {
            return LoginOutcome::Busy;
        };

        match self.sign_in(&form).await {
            Ok(Some(route)) => {
                info!("Navigating to {route} after login");
                self.ctx.navigator.navigate(route);
                LoginOutcome::Success(route)
            }
            Ok(None) => {
                self.ctx.alerts.alert(INVALID_CREDENTIALS);
                LoginOutcome::InvalidCredentials
            }
            Err(err) => {
                error!("Error logging in and storing tokens: {err}");
                self.ctx.alerts.alert(SOMETHING_WENT_WRONG);
                LoginOutcome::Failure
            }
        }
    }

    /// `None` when the server handed out no token pair.
    async fn sign_in(&self, form: &LoginForm) -> Result<Option<Route>, LoginError> {
        let reply = self.ctx.api.login(&form.username, &form.password).await?;
        let tokens = match reply.decode::<TokenPair>() {
            Ok(tokens) if !tokens.access.is_empty() && !tokens.refresh.is_empty() => tokens,
            Ok(_) | Err(_) => {
                warn!("Login refused with status {}", reply.status);
                return Ok(None);
            }
        };

        let session = self.ctx.session();
        session.store_tokens(&tokens).await?;

        let user: User = self.ctx.api.current_user().await?.entity()?;
        match user.group_id {
            Some(group_id) => {
                session.store_group(&group_id).await?;
                Ok(Some(Route::Home))
            }
            None => Ok(Some(Route::EnterGroup)),
        }
    }

    /// Forgets the stored credentials and returns to the login screen.
    pub async fn logout(&self) {
        if let Err(err) = self.ctx.session().clear().await {
            error!("Error clearing the session: {err}");
            self.ctx.alerts.alert(SOMETHING_WENT_WRONG);
            return;
        }
        self.ctx.navigator.navigate(Route::Login);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, user_json};
    use futures::executor::block_on;
    use huddle_interface::types::{
        ACCESS_TOKEN_KEY, GROUP_ID_KEY, Method, REFRESH_TOKEN_KEY,
    };
    use huddle_rest::testing::access_token;
    use serde_json::json;

    fn form(username: &str, password: &str) -> LoginForm {
        LoginForm {
            username: username.into(),
            password: password.into(),
        }
    }

    fn grant(harness: &Harness, user_id: u64) -> String {
        let access = access_token(user_id);
        harness.transport.respond(
            Method::Post,
            "core/login/",
            200,
            json!({ "access": access, "refresh": "refresh-token" }),
        );
        access
    }

    #[test]
    fn member_of_a_group_goes_home() {
        let harness = Harness::new();
        let access = grant(&harness, 4);
        harness
            .transport
            .respond(Method::Get, "core/users/4/", 200, user_json(4, "bob", Some("G1")));
        let login = Login::new(harness.ctx.clone());

        let outcome = block_on(login.submit(form("bob", "secret")));

        assert!(matches!(outcome, LoginOutcome::Success(Route::Home)));
        assert_eq!(harness.navigator.routes(), vec![Route::Home]);
        block_on(async {
            assert_eq!(harness.stored(ACCESS_TOKEN_KEY).await, Some(access));
            assert_eq!(
                harness.stored(REFRESH_TOKEN_KEY).await.as_deref(),
                Some("refresh-token")
            );
            assert_eq!(harness.stored(GROUP_ID_KEY).await.as_deref(), Some("G1"));
        });
        assert!(!login.is_loading());
        assert_eq!(login.state(), LoginState::Idle);
        assert!(harness.alerts.messages().is_empty());
    }

    #[test]
    fn profile_request_carries_the_new_token() {
        let harness = Harness::new();
        let access = grant(&harness, 4);
        harness
            .transport
            .respond(Method::Get, "core/users/4/", 200, user_json(4, "bob", Some("G1")));

        block_on(Login::new(harness.ctx.clone()).submit(form("bob", "secret")));

        let sent = harness.transport.requests();
        assert_eq!(sent[0].header("Authorization"), None);
        assert_eq!(
            sent[1].header("Authorization"),
            Some(format!("Bearer {access}").as_str())
        );
    }

    #[test]
    fn user_without_group_enters_one() {
        let harness = Harness::new();
        grant(&harness, 4);
        harness
            .transport
            .respond(Method::Get, "core/users/4/", 200, user_json(4, "bob", None));
        let login = Login::new(harness.ctx.clone());

        let outcome = block_on(login.submit(form("bob", "secret")));

        assert!(matches!(outcome, LoginOutcome::Success(Route::EnterGroup)));
        assert_eq!(harness.navigator.routes(), vec![Route::EnterGroup]);
        assert_eq!(block_on(harness.stored(GROUP_ID_KEY)), None);
        assert!(!login.is_loading());
    }

    #[test]
    fn wrong_password_is_reported() {
        let harness = Harness::new();
        harness.transport.respond(
            Method::Post,
            "core/login/",
            400,
            json!({ "detail": "No active account found with the given credentials" }),
        );
        let login = Login::new(harness.ctx.clone());

        let outcome = block_on(login.submit(form("bob", "wrong")));

        assert!(matches!(outcome, LoginOutcome::InvalidCredentials));
        assert_eq!(harness.alerts.messages(), vec![INVALID_CREDENTIALS]);
        assert!(block_on(harness.store.is_empty()));
        assert!(harness.navigator.routes().is_empty());
        assert!(!login.is_loading());
        assert_eq!(login.state(), LoginState::Idle);
    }

    #[test]
    fn failed_login_keeps_previous_tokens() {
        let harness = Harness::new();
        block_on(harness.sign_in(2));
        harness
            .transport
            .respond(Method::Post, "core/login/", 401, json!({ "detail": "nope" }));

        block_on(Login::new(harness.ctx.clone()).submit(form("bob", "wrong")));

        assert_eq!(
            block_on(harness.stored(ACCESS_TOKEN_KEY)),
            Some(access_token(2))
        );
    }

    #[test]
    fn unreachable_server_is_a_failure() {
        let harness = Harness::new();
        harness.transport.fail(Method::Post, "core/login/");
        let login = Login::new(harness.ctx.clone());

        let outcome = block_on(login.submit(form("bob", "secret")));

        assert!(matches!(outcome, LoginOutcome::Failure));
        assert_eq!(harness.alerts.messages(), vec![SOMETHING_WENT_WRONG]);
        assert!(!login.is_loading());
    }

    #[test]
    fn failure_after_storing_tokens_clears_the_indicator() {
        let harness = Harness::new();
        grant(&harness, 4);
        harness.transport.fail(Method::Get, "core/users/4/");
        let login = Login::new(harness.ctx.clone());

        let outcome = block_on(login.submit(form("bob", "secret")));

        assert!(matches!(outcome, LoginOutcome::Failure));
        assert!(harness.navigator.routes().is_empty());
        assert!(!login.is_loading());
        assert_eq!(login.state(), LoginState::Idle);
    }

    #[test]
    fn indicator_is_raised_while_submitting() {
        let harness = Harness::new();
        grant(&harness, 4);
        harness
            .transport
            .respond(Method::Get, "core/users/4/", 200, user_json(4, "bob", None));
        let login = std::sync::Arc::new(Login::new(harness.ctx.clone()));

        let observed = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let (watched, seen) = (login.clone(), observed.clone());
        harness.on_request(move |_| {
            seen.lock()
                .unwrap()
                .push((watched.is_loading(), watched.state()));
        });

        block_on(login.submit(form("bob", "secret")));

        let observed = observed.lock().unwrap().clone();
        assert_eq!(observed.len(), 2);
        assert!(
            observed
                .iter()
                .all(|seen| *seen == (true, LoginState::Submitting))
        );
        assert!(!login.is_loading());
    }

    #[test]
    fn second_submit_while_submitting_is_busy() {
        let harness = Harness::new();
        grant(&harness, 4);
        harness
            .transport
            .respond(Method::Get, "core/users/4/", 200, user_json(4, "bob", None));
        let login = Login::new(harness.ctx.clone());
        let release = harness.hold_next_request();

        let (first, second) = block_on(async {
            futures::join!(login.submit(form("bob", "secret")), async {
                let outcome = login.submit(form("bob", "secret")).await;
                release.send(()).unwrap();
                outcome
            })
        });

        assert!(matches!(first, LoginOutcome::Success(Route::EnterGroup)));
        assert!(matches!(second, LoginOutcome::Busy));
        assert_eq!(harness.transport.count(Method::Post, "core/login/"), 1);
        assert_eq!(harness.navigator.routes(), vec![Route::EnterGroup]);
        assert_eq!(login.state(), LoginState::Idle);
        assert!(!login.is_loading());
    }

    #[test]
    fn refused_profile_after_grant_is_a_failure() {
        let harness = Harness::new();
        grant(&harness, 4);
        harness.transport.respond(
            Method::Get,
            "core/users/4/",
            401,
            json!({ "detail": "Given token not valid for any token type" }),
        );
        let login = Login::new(harness.ctx.clone());

        let outcome = block_on(login.submit(form("bob", "secret")));

        assert!(matches!(outcome, LoginOutcome::Failure));
        assert_eq!(harness.alerts.messages(), vec![SOMETHING_WENT_WRONG]);
        assert!(harness.navigator.routes().is_empty());
        assert_eq!(block_on(harness.stored(GROUP_ID_KEY)), None);
        assert_eq!(login.state(), LoginState::Idle);
    }

    #[test]
    fn empty_fields_never_reach_the_server() {
        let harness = Harness::new();
        let login = Login::new(harness.ctx.clone());

        let LoginOutcome::Invalid(errors) = block_on(login.submit(form("", ""))) else {
            panic!("empty form accepted");
        };

        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("password"));
        assert!(harness.transport.requests().is_empty());
    }

    #[test]
    fn logout_forgets_everything() {
        let harness = Harness::new();
        block_on(async {
            harness.sign_in(3).await;
            harness.ctx.session().store_group("G1").await.unwrap();
        });

        block_on(Login::new(harness.ctx.clone()).logout());

        assert!(block_on(harness.store.is_empty()));
        assert_eq!(harness.navigator.routes(), vec![Route::Login]);
    }
}
