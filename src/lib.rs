//! Match Cache - An in-memory key/value cache with a match-spec query layer
//!
//! Entries are stored as fixed 4-field records `(key, touched_at, ttl,
//! value)` in a tuple table. Queries over the table are compiled into
//! selection specs: a positional pattern, a tree of guard expressions,
//! and a return projection. TTL expiration is checked on demand at read
//! time, and misses can be resolved through a configured fallback
//! callable.

pub mod cache;
pub mod config;
pub mod error;

pub use cache::CacheStore;
pub use config::CacheConfig;
pub use error::{CacheError, Result};
