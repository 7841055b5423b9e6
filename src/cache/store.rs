//! Cache Store Module
//!
//! Main cache façade combining the tuple table engine with the record
//! model, compiled live/expired scans, and miss-time fallback resolution.

use serde_json::Value;
use tracing::debug;

use crate::cache::matchspec::{select_expired, select_live, Field, Projection};
use crate::cache::record::{current_timestamp_ms, Record};
use crate::cache::table::TupleTable;
use crate::cache::{
    resolve_fallback, CacheStats, Fallback, FallbackOutcome, MAX_KEY_LENGTH, MAX_VALUE_SIZE,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Cache Store ==
/// Main cache storage with TTL support and match-spec scans.
#[derive(Debug)]
pub struct CacheStore {
    /// Record storage and scan engine
    table: TupleTable,
    /// Performance statistics
    stats: CacheStats,
    /// Cache-wide configuration
    config: CacheConfig,
    /// Millisecond clock, read fresh on every operation
    clock: fn() -> u64,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with the given configuration and the
    /// system wall clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, current_timestamp_ms)
    }

    /// Creates a CacheStore with an injected clock, for deterministic
    /// expiration behavior under test.
    pub fn with_clock(config: CacheConfig, clock: fn() -> u64) -> Self {
        Self {
            table: TupleTable::new(),
            stats: CacheStats::default(),
            config,
            clock,
        }
    }

    // == Put ==
    /// Stores a key-value pair with optional TTL.
    ///
    /// If the key already exists the record is replaced and its
    /// touched-at timestamp reset. Without an explicit TTL the configured
    /// default TTL applies; if neither is set the entry never expires.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl` - Optional TTL in milliseconds
    pub fn put(&mut self, key: String, value: Value, ttl: Option<u64>) -> Result<()> {
        // Validate key length
        if key.len() > MAX_KEY_LENGTH {
            return Err(CacheError::InvalidRequest(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }

        // Validate serialized value size
        let value_size = serde_json::to_vec(&value)
            .map_err(|e| CacheError::Internal(e.to_string()))?
            .len();
        if value_size > MAX_VALUE_SIZE {
            return Err(CacheError::InvalidRequest(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }

        let record = Record::new(key, value, ttl, self.config.default_ttl, (self.clock)());
        debug!(key = %record.key, ttl = ?record.ttl, "storing record");
        self.table.insert(record);

        self.stats.total_entries = self.table.len();
        Ok(())
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Expired entries are dropped on read and reported as misses, unless
    /// on-demand expiration is disabled in the configuration.
    pub fn get(&mut self, key: &str) -> Result<Value> {
        let now = (self.clock)();

        let Some(record) = self.table.get(key) else {
            self.stats.misses += 1;
            return Err(CacheError::NotFound(key.to_string()));
        };

        if record.is_expired(now, self.config.disable_ode) {
            debug!(key, "record expired on read");
            self.table.remove(key);
            self.stats.total_entries = self.table.len();
            self.stats.misses += 1;
            return Err(CacheError::Expired(key.to_string()));
        }

        let value = record.value.clone();
        self.stats.hits += 1;
        Ok(value)
    }

    // == Delete ==
    /// Removes an entry by key.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        if self.table.remove(key).is_some() {
            self.stats.total_entries = self.table.len();
            Ok(())
        } else {
            Err(CacheError::NotFound(key.to_string()))
        }
    }

    // == Resolve Miss ==
    /// Resolves a value for a key that missed the cache.
    ///
    /// Runs the fallback resolver against the configured fallback and
    /// extra arguments; a per-call `override_fallback` takes priority
    /// over the configured one. The outcome carries its provenance tag so
    /// callers can tell a loaded value from a static default.
    pub fn resolve_miss(
        &self,
        override_fallback: Option<&Fallback>,
        key: &str,
        default: Value,
    ) -> Result<FallbackOutcome> {
        resolve_fallback(
            override_fallback,
            self.config.default_fallback.as_ref(),
            key,
            &self.config.fallback_args,
            default,
        )
    }

    // == Live Scan ==
    /// Returns the requested projection for every live entry.
    ///
    /// The live/expired decision is made by the scan guard against the
    /// clock value at scan time.
    pub fn live(&self, return_spec: impl Into<Projection>) -> Vec<Vec<Value>> {
        self.table.select(&select_live(return_spec), (self.clock)())
    }

    // == Expired Scan ==
    /// Returns the requested projection for every expired entry.
    pub fn expired(&self, return_spec: impl Into<Projection>) -> Vec<Vec<Value>> {
        self.table
            .select(&select_expired(return_spec), (self.clock)())
    }

    // == Purge Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let removed = self
            .table
            .take(&select_expired(Field::Key), (self.clock)());
        let count = removed.len();

        if count > 0 {
            debug!(count, "purged expired records");
        }
        self.stats.purged += count as u64;
        self.stats.total_entries = self.table.len();
        count
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.table.len();
        stats
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    // == Is Empty ==
    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
