use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build and configure the application router
pub fn build_router(state: AppState) -> Router {
    // Classification is path-sensitive, so paths reach the handler untouched.
    Router::new()
        .fallback(handler::handle)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
