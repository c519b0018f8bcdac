use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use quill::domain::now_timestamp_ms;
use quill::ports::KeyValueStore;
use shared::config::Config;

/// Storage key for the rolling call log.
pub const LOG_KEY: &str = "api_performance_logs";
/// Only the most recent calls are kept.
pub const MAX_RECORDS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub endpoint: String,
    pub duration_ms: u64,
    pub success: bool,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallStats {
    pub total_calls: usize,
    pub success_rate: f64,
    pub avg_duration_ms: f64,
    pub max_duration_ms: u64,
    pub min_duration_ms: u64,
}

/// Rolling log of API call timings, persisted through a key-value store.
pub struct CallPerformanceLog {
    store: Arc<dyn KeyValueStore>,
    slow_threshold_ms: u64,
}

impl CallPerformanceLog {
    pub fn new(store: Arc<dyn KeyValueStore>, config: &Config) -> Self {
        Self {
            store,
            slow_threshold_ms: config.slow_request_threshold_ms,
        }
    }

    /// Append one call, trimming the log to `MAX_RECORDS`.
    pub async fn record(&self, endpoint: &str, duration_ms: u64, success: bool) {
        if duration_ms > self.slow_threshold_ms {
            warn!("Slow API call to {}: {}ms", endpoint, duration_ms);
        } else if duration_ms > 1000 {
            info!("API call to {}: {}ms", endpoint, duration_ms);
        }

        let mut records = self.load().await;
        records.push(CallRecord {
            endpoint: endpoint.to_string(),
            duration_ms,
            success,
            timestamp: now_timestamp_ms(),
        });
        if records.len() > MAX_RECORDS {
            let excess = records.len() - MAX_RECORDS;
            records.drain(..excess);
        }

        match serde_json::to_string(&records) {
            Ok(raw) => {
                if let Err(error) = self.store.set(LOG_KEY, &raw).await {
                    warn!("Failed to persist performance log: {}", error);
                }
            }
            Err(error) => warn!("Failed to serialize performance log: {}", error),
        }
    }

    /// A missing or unreadable log reads as empty.
    pub async fn load(&self) -> Vec<CallRecord> {
        match self.store.get(LOG_KEY).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_default(),
            Ok(None) => Vec::new(),
            Err(error) => {
                warn!("Failed to read performance log: {}", error);
                Vec::new()
            }
        }
    }

    /// `None` until at least one call has been recorded.
    pub async fn stats(&self) -> Option<CallStats> {
        let records = self.load().await;
        if records.is_empty() {
            return None;
        }

        let total = records.len();
        let successes = records.iter().filter(|r| r.success).count();
        let sum: u64 = records.iter().map(|r| r.duration_ms).sum();
        Some(CallStats {
            total_calls: total,
            success_rate: successes as f64 / total as f64 * 100.0,
            avg_duration_ms: sum as f64 / total as f64,
            max_duration_ms: records.iter().map(|r| r.duration_ms).max().unwrap_or(0),
            min_duration_ms: records.iter().map(|r| r.duration_ms).min().unwrap_or(0),
        })
    }

    pub async fn clear(&self) {
        if let Err(error) = self.store.remove(LOG_KEY).await {
            warn!("Failed to clear performance log: {}", error);
        }
    }
}
