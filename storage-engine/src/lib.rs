// storage-engine/src/lib.rs
//
// Storage backends behind the `quill` ports: a sled-backed durable
// key/value store and the two-tier cache built on top of it.

pub mod local_cache;
pub mod sled_store;

pub use local_cache::LocalCache;
pub use sled_store::SledStore;
