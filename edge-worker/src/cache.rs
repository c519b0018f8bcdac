use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::http::header::{ACCEPT_ENCODING, AUTHORIZATION};
use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use moka::future::Cache;

use crate::classify::RequestClass;

/// A buffered 200 response held at the edge until its TTL runs out.
#[derive(Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub expire_at: u64,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes, ttl: Duration) -> Self {
        Self {
            status,
            headers,
            body,
            expire_at: now_ms() + ttl.as_millis() as u64,
        }
    }

    pub fn is_expired(&self) -> bool {
        now_ms() >= self.expire_at
    }
}

/// In-memory response cache with lazy expiry on read.
pub struct ResponseCache {
    entries: Cache<String, CachedResponse>,
}

impl ResponseCache {
    pub fn new(max_entries: u64) -> Self {
        Self {
            entries: Cache::builder().max_capacity(max_entries).build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<CachedResponse> {
        let entry = self.entries.get(key).await?;
        if entry.is_expired() {
            self.entries.invalidate(key).await;
            return None;
        }
        Some(entry)
    }

    pub async fn insert(&self, key: String, response: CachedResponse) {
        self.entries.insert(key, response).await;
    }

    pub async fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }
}

/// Keys carry whatever the cached response may vary by: the bearer token
/// for private API responses, the encoding for pages.
pub fn cache_key(path_and_query: &str, class: RequestClass, headers: &HeaderMap) -> String {
    let mut key = path_and_query.to_string();
    match class {
        RequestClass::ApiCacheable => {
            if let Some(auth) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
                key.push_str("|auth=");
                key.push_str(auth);
            }
        }
        RequestClass::Html => {
            if let Some(encoding) = headers.get(ACCEPT_ENCODING).and_then(|v| v.to_str().ok()) {
                key.push_str("|enc=");
                key.push_str(encoding);
            }
        }
        _ => {}
    }
    key
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn entry(ttl: Duration) -> CachedResponse {
        CachedResponse::new(
            StatusCode::OK,
            HeaderMap::new(),
            Bytes::from_static(b"payload"),
            ttl,
        )
    }

    #[tokio::test]
    async fn expired_entries_are_dropped_on_read() {
        let cache = ResponseCache::new(16);
        cache
            .insert("k".to_string(), entry(Duration::from_millis(40)))
            .await;
        assert!(cache.get("k").await.is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(cache.get("k").await.is_none());
        assert_eq!(cache.entry_count().await, 0);
    }

    #[test]
    fn keys_discriminate_on_the_bearer_token() {
        let mut alice = HeaderMap::new();
        alice.insert(AUTHORIZATION, HeaderValue::from_static("Bearer a"));
        let mut bob = HeaderMap::new();
        bob.insert(AUTHORIZATION, HeaderValue::from_static("Bearer b"));

        let key_a = cache_key("/api/user/profile", RequestClass::ApiCacheable, &alice);
        let key_b = cache_key("/api/user/profile", RequestClass::ApiCacheable, &bob);

        assert_ne!(key_a, key_b);
        assert!(key_a.contains("Bearer a"));
    }

    #[test]
    fn keys_discriminate_on_accept_encoding_for_pages() {
        let mut gzip = HeaderMap::new();
        gzip.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        let plain = cache_key("/", RequestClass::Html, &HeaderMap::new());
        let compressed = cache_key("/", RequestClass::Html, &gzip);

        assert_ne!(plain, compressed);
    }

    #[test]
    fn static_keys_ignore_request_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer a"));

        assert_eq!(
            cache_key("/app.js", RequestClass::StaticAsset, &headers),
            "/app.js"
        );
    }
}
