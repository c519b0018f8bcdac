use std::sync::Arc;

use shared::config::Config;
use shared::Result;

use crate::cache::ResponseCache;
use crate::origin::OriginClient;

const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ResponseCache>,
    pub origin: OriginClient,
    pub allowed_origin: String,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            cache: Arc::new(ResponseCache::new(DEFAULT_MAX_ENTRIES)),
            origin: OriginClient::new(config)?,
            allowed_origin: config.allowed_origin.clone(),
        })
    }
}
