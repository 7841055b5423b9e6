//! Cache Module
//!
//! Provides in-memory caching over a fixed-width tuple table, with TTL
//! expiration, compiled match-spec queries, and fallback resolution for
//! misses.

mod fallback;
mod matchspec;
mod record;
mod stats;
mod store;
mod table;


// Re-export public types
pub use fallback::{resolve_fallback, Fallback, FallbackOutcome};
pub use matchspec::{
    build_selection, select_expired, select_live, Field, Guard, GuardList, Projection,
    SelectionSpec, Term,
};
pub use record::{current_timestamp_ms, is_expired, Record, RECORD_FIELDS};
pub use stats::CacheStats;
pub use store::CacheStore;
pub use table::TupleTable;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed serialized value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
