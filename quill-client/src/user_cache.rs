use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use quill::domain::UserInfo;
use shared::config::Config;
use shared::{Result, TtlMs};
use storage_engine::LocalCache;

use crate::api::ApiClient;

pub const PROFILE_KEY: &str = "user_profile";
pub const CREDITS_KEY: &str = "user_credits";
pub const HISTORY_KEY: &str = "user_history";

/// Read-through cache for per-user API data, one TTL class per key.
pub struct UserProfileCache {
    cache: Arc<LocalCache>,
    profile_ttl: TtlMs,
    credits_ttl: TtlMs,
    history_ttl: TtlMs,
}

impl UserProfileCache {
    pub fn new(cache: Arc<LocalCache>, config: &Config) -> Self {
        Self {
            cache,
            profile_ttl: TtlMs(config.cache_profile_ttl_ms),
            credits_ttl: TtlMs(config.cache_credits_ttl_ms),
            history_ttl: TtlMs(config.cache_default_ttl_ms),
        }
    }

    pub async fn profile(&self) -> Option<UserInfo> {
        let value = self.cache.get(PROFILE_KEY).await?;
        serde_json::from_value(value).ok()
    }

    pub async fn store_profile(&self, user: &UserInfo) {
        match serde_json::to_value(user) {
            Ok(value) => self.cache.set(PROFILE_KEY, value, self.profile_ttl).await,
            Err(error) => warn!("Failed to serialize profile for caching: {}", error),
        }
    }

    pub async fn credits(&self) -> Option<u64> {
        self.cache.get(CREDITS_KEY).await?.as_u64()
    }

    pub async fn store_credits(&self, credits: u64) {
        self.cache
            .set(CREDITS_KEY, Value::from(credits), self.credits_ttl)
            .await;
    }

    pub async fn history(&self) -> Option<Vec<Value>> {
        match self.cache.get(HISTORY_KEY).await? {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub async fn store_history(&self, history: &[Value]) {
        self.cache
            .set(HISTORY_KEY, Value::Array(history.to_vec()), self.history_ttl)
            .await;
    }

    /// Serve the profile from cache, falling back to the API and caching
    /// what it returns.
    pub async fn profile_via(&self, api: &ApiClient) -> Result<UserInfo> {
        if let Some(user) = self.profile().await {
            return Ok(user);
        }
        let response = api.profile().await?;
        self.store_profile(&response.user).await;
        Ok(response.user)
    }

    pub async fn clear_user_data(&self) {
        self.cache.delete(PROFILE_KEY).await;
        self.cache.delete(CREDITS_KEY).await;
        self.cache.delete(HISTORY_KEY).await;
    }
}
