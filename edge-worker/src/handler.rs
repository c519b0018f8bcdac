use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header::{HeaderValue, CONTENT_TYPE};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use tracing::{debug, error};

use crate::cache::{cache_key, CachedResponse};
use crate::classify::{classify, RequestClass};
use crate::policy;
use crate::state::AppState;

/// Upper bound on buffered request bodies.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Single entry point; every path and method lands here.
pub async fn handle(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());
    let class = classify(parts.uri.path(), &parts.method);

    if class == RequestClass::CorsPreflight {
        return preflight_response(&state.allowed_origin);
    }

    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(error) => {
            error!("Failed to buffer request body: {}", error);
            return unavailable_response(&state.allowed_origin);
        }
    };

    match serve(
        &state,
        class,
        &parts.method,
        parts.uri.path(),
        &path_and_query,
        &parts.headers,
        body,
    )
    .await
    {
        Ok(response) => response,
        Err(error) => {
            error!("Origin request for {} failed: {}", path_and_query, error);
            unavailable_response(&state.allowed_origin)
        }
    }
}

async fn serve(
    state: &AppState,
    class: RequestClass,
    method: &Method,
    path: &str,
    path_and_query: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> shared::Result<Response> {
    // Only GET responses are ever cached.
    let ttl = if *method == Method::GET {
        policy::cache_ttl(class, path)
    } else {
        None
    };
    let key = cache_key(path_and_query, class, headers);

    if ttl.is_some() {
        if let Some(cached) = state.cache.get(&key).await {
            debug!("Cache hit: {}", key);
            return Ok(build_response(
                cached.status,
                cached.headers,
                cached.body,
                class,
                path,
                state,
            ));
        }
    }

    let origin = state
        .origin
        .forward(method.clone(), path_and_query, headers, body)
        .await?;

    if origin.status == StatusCode::OK {
        if let Some(ttl) = ttl {
            debug!("Caching {} for {:?}", key, ttl);
            let entry =
                CachedResponse::new(origin.status, origin.headers.clone(), origin.body.clone(), ttl);
            let cache = state.cache.clone();
            // Population happens off the response path.
            tokio::spawn(async move {
                cache.insert(key, entry).await;
            });
        }
    }

    Ok(build_response(
        origin.status,
        origin.headers,
        origin.body,
        class,
        path,
        state,
    ))
}

fn build_response(
    status: StatusCode,
    mut headers: HeaderMap,
    body: Bytes,
    class: RequestClass,
    path: &str,
    state: &AppState,
) -> Response {
    policy::apply_response_headers(class, path, status, &state.allowed_origin, &mut headers);
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn preflight_response(allowed_origin: &str) -> Response {
    let mut response = Response::new(Body::empty());
    *response.headers_mut() = policy::preflight_headers(allowed_origin);
    response
}

fn unavailable_response(allowed_origin: &str) -> Response {
    let mut response = Response::new(Body::from(policy::UNAVAILABLE_BODY));
    *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    policy::append_allow_origin(allowed_origin, response.headers_mut());
    response
}
