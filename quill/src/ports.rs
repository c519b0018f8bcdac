use async_trait::async_trait;
use shared::Result;

// Ports are the pluggable seams between the core and its environment

/// Flat string key/value persistence. Backs both the durable cache tier
/// and the session records; consumers treat unreadable values as absent.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Outcome of one authoritative balance fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceRefresh {
    /// The backend confirmed this balance.
    Balance(u64),
    /// The stored token was rejected.
    Unauthorized,
    /// There is no stored token to authenticate with.
    NoSession,
}

/// Port for fetching the authoritative credit balance from the backend.
/// Implementations must bypass every cache layer.
#[async_trait]
pub trait BalanceSource: Send + Sync + 'static {
    async fn fetch_balance(&self) -> Result<BalanceRefresh>;
}
