use std::time::Duration;

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::StatusCode;
use chrono::Utc;

use crate::classify::RequestClass;

pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const ALLOWED_HEADERS: &str = "Content-Type, Authorization";
pub const PREFLIGHT_MAX_AGE: &str = "86400";
pub const UNAVAILABLE_BODY: &str = "Service temporarily unavailable";

const STATIC_MAX_AGE_SECS: u64 = 31_536_000;
const HTML_MAX_AGE_SECS: u64 = 3_600;
const API_PUBLIC_MAX_AGE_SECS: u64 = 60;
const API_PRIVATE_MAX_AGE_SECS: u64 = 300;

/// How long a 200 response of this class may be served from the edge.
pub fn cache_ttl(class: RequestClass, path: &str) -> Option<Duration> {
    match class {
        RequestClass::StaticAsset => Some(Duration::from_secs(STATIC_MAX_AGE_SECS)),
        RequestClass::Html => Some(Duration::from_secs(HTML_MAX_AGE_SECS)),
        RequestClass::ApiCacheable => {
            if path.contains("/user/profile") {
                Some(Duration::from_secs(API_PRIVATE_MAX_AGE_SECS))
            } else {
                Some(Duration::from_secs(API_PUBLIC_MAX_AGE_SECS))
            }
        }
        _ => None,
    }
}

/// Stamp the headers this class calls for. Cache directives only go on
/// 200 responses; CORS goes on every API response.
pub fn apply_response_headers(
    class: RequestClass,
    path: &str,
    status: StatusCode,
    allowed_origin: &str,
    headers: &mut HeaderMap,
) {
    match class {
        RequestClass::StaticAsset if status == StatusCode::OK => {
            set_header(
                headers,
                header::CACHE_CONTROL,
                &format!("public, max-age={}", STATIC_MAX_AGE_SECS),
            );
            let expires = Utc::now() + chrono::Duration::seconds(STATIC_MAX_AGE_SECS as i64);
            set_header(
                headers,
                header::EXPIRES,
                &expires.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
            );
            append_allow_origin(allowed_origin, headers);
        }
        RequestClass::ApiCacheable => {
            if status == StatusCode::OK {
                let directive = if path.contains("/user/profile") {
                    format!("private, max-age={}", API_PRIVATE_MAX_AGE_SECS)
                } else {
                    format!("public, max-age={}", API_PUBLIC_MAX_AGE_SECS)
                };
                set_header(headers, header::CACHE_CONTROL, &directive);
            }
            append_cors(allowed_origin, headers);
        }
        RequestClass::ApiNonCacheable => append_cors(allowed_origin, headers),
        RequestClass::Html if status == StatusCode::OK => {
            set_header(
                headers,
                header::CACHE_CONTROL,
                &format!("public, max-age={}", HTML_MAX_AGE_SECS),
            );
            set_header(headers, header::VARY, "Accept-Encoding");
        }
        _ => {}
    }
}

/// Canned headers for an OPTIONS preflight answer.
pub fn preflight_headers(allowed_origin: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    append_cors(allowed_origin, &mut headers);
    set_header(
        &mut headers,
        header::ACCESS_CONTROL_MAX_AGE,
        PREFLIGHT_MAX_AGE,
    );
    headers
}

pub fn append_cors(allowed_origin: &str, headers: &mut HeaderMap) {
    append_allow_origin(allowed_origin, headers);
    set_header(
        headers,
        header::ACCESS_CONTROL_ALLOW_METHODS,
        ALLOWED_METHODS,
    );
    set_header(
        headers,
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        ALLOWED_HEADERS,
    );
}

pub fn append_allow_origin(allowed_origin: &str, headers: &mut HeaderMap) {
    set_header(headers, header::ACCESS_CONTROL_ALLOW_ORIGIN, allowed_origin);
}

fn set_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}
