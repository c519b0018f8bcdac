use crate::domain::UserInfo;
use crate::ports::KeyValueStore;
use shared::{Error, Result};
use std::sync::Arc;
use tracing::warn;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const USER_INFO_KEY: &str = "user_info";

/// Persisted authentication state: the bearer token and the user record
/// that came with it. Tokens are opaque pass-through strings; this layer
/// never mints or validates them.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The bearer token, if a session is present. Storage faults read as
    /// no session.
    pub async fn token(&self) -> Option<String> {
        match self.store.get(ACCESS_TOKEN_KEY).await {
            Ok(token) => token,
            Err(e) => {
                warn!("Failed to read access token: {}", e);
                None
            }
        }
    }

    /// Persist a fresh login.
    pub async fn save(&self, token: &str, user: &UserInfo) -> Result<()> {
        self.store.set(ACCESS_TOKEN_KEY, token).await?;
        let json = serde_json::to_string(user)
            .map_err(|e| Error::Internal(format!("Failed to serialize user info: {}", e)))?;
        self.store.set(USER_INFO_KEY, &json).await
    }

    /// The stored user record. Missing or unparsable records read as none.
    pub async fn user(&self) -> Option<UserInfo> {
        let raw = match self.store.get(USER_INFO_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read user info: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Stored user info is not valid JSON, ignoring: {}", e);
                None
            }
        }
    }

    /// Patch the credits field of the stored user record. A missing record
    /// is not an error; there is simply nothing to patch.
    pub async fn update_credits(&self, credits: u64) -> Result<()> {
        let Some(mut user) = self.user().await else {
            return Ok(());
        };

        user.credits = credits;
        let json = serde_json::to_string(&user)
            .map_err(|e| Error::Internal(format!("Failed to serialize user info: {}", e)))?;
        self.store.set(USER_INFO_KEY, &json).await
    }

    /// Drop the whole session, token and user record both.
    pub async fn clear(&self) -> Result<()> {
        self.store.remove(ACCESS_TOKEN_KEY).await?;
        self.store.remove(USER_INFO_KEY).await
    }
}
