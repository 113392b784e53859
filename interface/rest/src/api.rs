//! Endpoints of the group service.

use huddle_interface::types::{Method, UserId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::{
    dispatcher::{DispatchError, Dispatcher, Reply},
    jwt,
    session::Session,
};

/// Body of a 400 answer: messages per rejected field.
#[derive(Debug, Default, Deserialize)]
pub struct FieldErrors {
    #[serde(default)]
    pub username: Vec<String>,
    #[serde(default)]
    pub name: Vec<String>,
    #[serde(default)]
    pub email: Vec<String>,
}
impl FieldErrors {
    /// First message, looking at username, name then email.
    pub fn first_message(&self) -> Option<&str> {
        [&self.username, &self.name, &self.email]
            .into_iter()
            .find_map(|messages| messages.first())
            .map(String::as_str)
    }
}

#[derive(Clone)]
pub struct Api {
    dispatcher: Dispatcher,
}

impl Api {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn session(&self) -> &Session {
        self.dispatcher.session()
    }

    /// Id of the signed in user, read from the access token claims.
    pub async fn current_user_id(&self) -> Result<UserId, DispatchError> {
        let token = self
            .session()
            .access_token()
            .await?
            .ok_or(DispatchError::NoSession)?;
        Ok(jwt::user_id(token.unsecure())?)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Reply, DispatchError> {
        info!("Logging in as {username}");
        self.dispatcher
            .request_public(
                "core/login/",
                Method::Post,
                Some(json!({ "username": username, "password": password })),
            )
            .await
    }

    pub async fn user(&self, id: UserId) -> Result<Reply, DispatchError> {
        self.dispatcher
            .request(&format!("core/users/{id}/"), Method::Get, None)
            .await
    }

    pub async fn current_user(&self) -> Result<Reply, DispatchError> {
        let id = self.current_user_id().await?;
        self.user(id).await
    }

    /// Partial update of the signed in user.
    pub async fn patch_current_user<T: Serialize>(&self, fields: &T) -> Result<Reply, DispatchError> {
        let id = self.current_user_id().await?;
        self.dispatcher
            .request(
                &format!("core/users/{id}/"),
                Method::Patch,
                Some(serde_json::to_value(fields)?),
            )
            .await
    }

    pub async fn group(&self, group_id: &str) -> Result<Reply, DispatchError> {
        self.dispatcher
            .request(&format!("group/groups/{group_id}/"), Method::Get, None)
            .await
    }

    pub async fn group_members(&self, group_id: &str) -> Result<Reply, DispatchError> {
        self.dispatcher
            .request(
                &format!("group/groups/{group_id}/members/"),
                Method::Get,
                None,
            )
            .await
    }

    pub async fn set_group_privacy(
        &self,
        group_id: &str,
        private: bool,
    ) -> Result<Reply, DispatchError> {
        self.dispatcher
            .request(
                &format!("group/groups/{group_id}/"),
                Method::Patch,
                Some(json!({ "private": private })),
            )
            .await
    }
}
