// quill-client/src/lib.rs
//
// HTTP side of the client layer: the retrying transport, the typed API
// client built on it, and the user-scoped caching helpers.

pub mod api;
pub mod models;
pub mod perf;
pub mod transport;
pub mod user_cache;
