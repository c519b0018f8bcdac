use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use edge_worker::{build_router, AppState};
use http_body_util::BodyExt;
use shared::config::Config;
use tower::ServiceExt;
use wiremock::matchers::{header as header_eq, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn router_for(origin_url: String) -> Router {
    let mut config = Config::from_env();
    config.origin_url = origin_url;
    config.allowed_origin = "*".to_string();
    build_router(AppState::new(&config).unwrap())
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// Lets the spawned cache population land before the next request.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn preflight_is_answered_without_touching_the_origin() {
    let server = MockServer::start().await;
    let router = router_for(server.uri());

    let response = send(
        &router,
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/chat")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
        "GET, POST, PUT, DELETE, OPTIONS"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap(),
        "Content-Type, Authorization"
    );
    assert_eq!(headers.get(header::ACCESS_CONTROL_MAX_AGE).unwrap(), "86400");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn static_assets_get_long_lived_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app.css"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/css")
                .set_body_string("body{}"),
        )
        .mount(&server)
        .await;
    let router = router_for(server.uri());

    let response = send(&router, get("/app.css")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers.get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=31536000"
    );
    assert!(headers.contains_key(header::EXPIRES));
    assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
    assert_eq!(body_text(response).await, "body{}");
}

#[tokio::test]
async fn profile_responses_are_marked_private() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"user\":{}}"))
        .mount(&server)
        .await;
    let router = router_for(server.uri());

    let response = send(&router, get("/api/user/profile")).await;

    let headers = response.headers();
    assert_eq!(
        headers.get(header::CACHE_CONTROL).unwrap(),
        "private, max-age=300"
    );
    assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap(),
        "Content-Type, Authorization"
    );
}

#[tokio::test]
async fn non_cacheable_api_calls_get_cors_only() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"reply\":\"hi\"}"))
        .expect(2)
        .mount(&server)
        .await;
    let router = router_for(server.uri());

    for _ in 0..2 {
        let response = send(
            &router,
            Request::builder()
                .method(Method::POST)
                .uri("/api/chat")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await;

        let headers = response.headers();
        assert!(headers.get(header::CACHE_CONTROL).is_none());
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        settle().await;
    }
}

#[tokio::test]
async fn unlisted_api_gets_are_never_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/unknown"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"data\":1}"))
        .expect(2)
        .mount(&server)
        .await;
    let router = router_for(server.uri());

    for _ in 0..2 {
        let response = send(&router, get("/api/unknown")).await;

        let headers = response.headers();
        assert!(headers.get(header::CACHE_CONTROL).is_none());
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
        settle().await;
    }

    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn repeat_gets_are_served_from_the_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/database/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;
    let router = router_for(server.uri());

    let first = send(&router, get("/api/database/status")).await;
    assert_eq!(body_text(first).await, "ok");
    settle().await;

    let second = send(&router, get("/api/database/status")).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(
        second.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=60"
    );
    assert_eq!(body_text(second).await, "ok");
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_origin_responses_are_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cache/stats"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cache/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;
    let router = router_for(server.uri());

    let first = send(&router, get("/api/cache/stats")).await;
    assert_eq!(first.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(first.headers().get(header::CACHE_CONTROL).is_none());
    settle().await;

    let second = send(&router, get("/api/cache/stats")).await;
    assert_eq!(second.status(), StatusCode::OK);
    settle().await;

    // The 200 is now cached; the origin saw exactly two requests.
    let third = send(&router, get("/api/cache/stats")).await;
    assert_eq!(third.status(), StatusCode::OK);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn cached_profiles_are_keyed_by_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/profile"))
        .and(header_eq("Authorization", "Bearer alice"))
        .respond_with(ResponseTemplate::new(200).set_body_string("alice"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/user/profile"))
        .and(header_eq("Authorization", "Bearer bob"))
        .respond_with(ResponseTemplate::new(200).set_body_string("bob"))
        .expect(1)
        .mount(&server)
        .await;
    let router = router_for(server.uri());

    let authed = |token: &str| {
        Request::builder()
            .method(Method::GET)
            .uri("/api/user/profile")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    };

    assert_eq!(body_text(send(&router, authed("alice")).await).await, "alice");
    settle().await;
    assert_eq!(body_text(send(&router, authed("bob")).await).await, "bob");
    settle().await;

    // Alice's second read is a cache hit with her own payload.
    assert_eq!(body_text(send(&router, authed("alice")).await).await, "alice");
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn pages_get_medium_cache_and_vary() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/html")
                .set_body_string("<html></html>"),
        )
        .mount(&server)
        .await;
    let router = router_for(server.uri());

    let response = send(&router, get("/")).await;

    let headers = response.headers();
    assert_eq!(
        headers.get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=3600"
    );
    assert_eq!(headers.get(header::VARY).unwrap(), "Accept-Encoding");
    assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn unreachable_origin_turns_into_503() {
    let router = router_for("http://127.0.0.1:9".to_string());

    let response = send(&router, get("/api/chat")).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let headers = response.headers();
    assert_eq!(
        headers.get(header::CONTENT_TYPE).unwrap(),
        "text/plain; charset=utf-8"
    );
    assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
    assert_eq!(body_text(response).await, "Service temporarily unavailable");
}

#[tokio::test]
async fn queries_produce_distinct_cache_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/database/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(2)
        .mount(&server)
        .await;
    let router = router_for(server.uri());

    send(&router, get("/api/database/status")).await;
    settle().await;
    send(&router, get("/api/database/status?_t=123")).await;
    settle().await;

    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}
