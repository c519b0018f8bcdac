use std::time::Duration;

use axum::http::{HeaderMap, Method, StatusCode};
use bytes::Bytes;
use shared::config::Config;
use shared::{Error, Result};

/// Hop-by-hop headers that must not be forwarded in either direction.
const HOP_HEADERS: [&str; 4] = ["host", "content-length", "transfer-encoding", "connection"];

/// A fully buffered upstream response.
pub struct OriginResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Forwards requests to the backend and buffers what comes back.
#[derive(Clone)]
pub struct OriginClient {
    client: reqwest::Client,
    base_url: String,
}

impl OriginClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build origin client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.origin_url.clone(),
        })
    }

    pub async fn forward(
        &self,
        method: Method,
        path_and_query: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<OriginResponse> {
        let url = format!("{}{}", self.base_url, path_and_query);

        let mut request = self.client.request(method, &url);
        for (name, value) in headers {
            if HOP_HEADERS.contains(&name.as_str()) {
                continue;
            }
            request = request.header(name.clone(), value.clone());
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Internal(format!("Origin request failed: {}", e)))?;

        let status = response.status();
        let mut response_headers = response.headers().clone();
        for name in HOP_HEADERS {
            response_headers.remove(name);
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Internal(format!("Failed to read origin response: {}", e)))?;

        Ok(OriginResponse {
            status,
            headers: response_headers,
            body,
        })
    }
}
