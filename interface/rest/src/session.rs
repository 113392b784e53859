use huddle_interface::{
    interface::{KeyValueStore, StoreError},
    types::{ACCESS_TOKEN_KEY, Credential, GROUP_ID_KEY, REFRESH_TOKEN_KEY, TokenPair},
};
use secure_string::SecureString;
use std::sync::Arc;
use tracing::info;

/// Handle on the persisted credentials.
///
/// Cloning is cheap and every clone sees the same store. Concurrent writers
/// are not serialized, the last one wins.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn KeyValueStore>,
}

impl Session {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The signed in credential, `None` unless both tokens are present.
    pub async fn current(&self) -> Result<Option<Credential>, StoreError> {
        let access = self.store.get(ACCESS_TOKEN_KEY).await?;
        let refresh = self.store.get(REFRESH_TOKEN_KEY).await?;
        let group_id = self.group_id().await?;

        Ok(access.zip(refresh).map(|(access, refresh)| Credential {
            access_token: access.into(),
            refresh_token: refresh.into(),
            group_id,
        }))
    }

    pub async fn access_token(&self) -> Result<Option<SecureString>, StoreError> {
        Ok(self.store.get(ACCESS_TOKEN_KEY).await?.map(SecureString::from))
    }

    pub async fn group_id(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .store
            .get(GROUP_ID_KEY)
            .await?
            .filter(|group| !group.is_empty()))
    }

    pub async fn store_tokens(&self, tokens: &TokenPair) -> Result<(), StoreError> {
        self.store.put(REFRESH_TOKEN_KEY, &tokens.refresh).await?;
        self.store.put(ACCESS_TOKEN_KEY, &tokens.access).await
    }

    pub async fn store_group(&self, group_id: &str) -> Result<(), StoreError> {
        self.store.put(GROUP_ID_KEY, group_id).await
    }

    /// Forgets everything about the signed in user.
    pub async fn clear(&self) -> Result<(), StoreError> {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, GROUP_ID_KEY] {
            self.store.remove(key).await?;
        }
        info!("Session cleared");
        Ok(())
    }
}
