// edge-worker/src/lib.rs
//
// Caching edge in front of the essay backend: classifies each incoming
// request, serves hot responses from memory, and stamps the cache and
// CORS policy the class calls for.

pub mod cache;
pub mod classify;
pub mod handler;
pub mod origin;
pub mod policy;
pub mod routes;
pub mod state;

// Re-export key types
pub use routes::build_router;
pub use state::AppState;
