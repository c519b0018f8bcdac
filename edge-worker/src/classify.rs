use axum::http::Method;

/// Extensions served with long-lived caching.
const STATIC_EXTENSIONS: [&str; 12] = [
    ".css", ".js", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico", ".woff", ".woff2", ".ttf",
    ".eot",
];

/// API endpoints whose GET responses may be held at the edge.
const CACHEABLE_API_PREFIXES: [&str; 3] = [
    "/api/database/status",
    "/api/user/profile",
    "/api/cache/stats",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    CorsPreflight,
    StaticAsset,
    ApiCacheable,
    ApiNonCacheable,
    Html,
    PassThrough,
}

/// Checks run in declaration order; the first match wins.
pub fn classify(path: &str, method: &Method) -> RequestClass {
    if method == Method::OPTIONS {
        return RequestClass::CorsPreflight;
    }
    if is_static_asset(path) {
        return RequestClass::StaticAsset;
    }
    if path.starts_with("/api/") {
        if method == Method::GET && is_cacheable_api(path) {
            return RequestClass::ApiCacheable;
        }
        return RequestClass::ApiNonCacheable;
    }
    if is_html_page(path) {
        return RequestClass::Html;
    }
    RequestClass::PassThrough
}

fn is_static_asset(path: &str) -> bool {
    STATIC_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

fn is_cacheable_api(path: &str) -> bool {
    CACHEABLE_API_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

/// A path without an extension reads as a page.
fn is_html_page(path: &str) -> bool {
    path.ends_with(".html") || path == "/" || !path.contains('.')
}
