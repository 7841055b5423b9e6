//! Cache Record Module
//!
//! Defines the fixed 4-field record stored for each cache entry and the
//! on-demand expiration predicate over it.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of fields in a stored record. Slot numbering is 1-based.
pub const RECORD_FIELDS: usize = 4;

// == Cache Record ==
/// A single cache entry as stored in the tuple table.
///
/// Field order is fixed as `(key, touched_at, ttl, value)` and maps to
/// slots 1..4. The match-spec compiler and the table engine both depend
/// on this layout, so fields are never reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Primary lookup key, unique per table
    pub key: String,
    /// Creation timestamp (Unix milliseconds)
    pub touched_at: u64,
    /// Time-to-live in milliseconds, None = never expires
    pub ttl: Option<u64>,
    /// The stored payload
    pub value: Value,
}

impl Record {
    // == Constructor ==
    /// Creates a new record touched at `now`.
    ///
    /// # Arguments
    /// * `key` - The lookup key, stored verbatim
    /// * `value` - The payload, stored verbatim
    /// * `ttl_override` - Per-entry TTL in milliseconds, if any
    /// * `default_ttl` - Cache-wide default TTL used when no override is given
    /// * `now` - Current time in Unix milliseconds
    pub fn new(
        key: String,
        value: Value,
        ttl_override: Option<u64>,
        default_ttl: Option<u64>,
        now: u64,
    ) -> Self {
        Self {
            key,
            touched_at: now,
            ttl: ttl_override.or(default_ttl),
            value,
        }
    }

    // == Slot Access ==
    /// Returns the value bound to a 1-based positional slot.
    ///
    /// Slot 1 is the key, slot 2 the touched-at timestamp, slot 3 the TTL
    /// (JSON null when absent), slot 4 the payload. Out-of-range slots
    /// yield null rather than panicking, matching the permissive guard
    /// evaluation of the table engine.
    pub fn slot(&self, slot: usize) -> Value {
        match slot {
            1 => Value::String(self.key.clone()),
            2 => Value::from(self.touched_at),
            3 => self.ttl.map(Value::from).unwrap_or(Value::Null),
            4 => self.value.clone(),
            _ => Value::Null,
        }
    }

    // == Is Expired ==
    /// Checks whether this record has expired as of `now`.
    pub fn is_expired(&self, now: u64, ode_disabled: bool) -> bool {
        is_expired(now, self.touched_at, self.ttl, ode_disabled)
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds as of `now`, or None if the
    /// record never expires.
    ///
    /// # Returns
    /// - `Some(0)` if the TTL has fully elapsed
    /// - `Some(remaining_ms)` otherwise
    /// - `None` if the record has no TTL
    pub fn ttl_remaining_ms(&self, now: u64) -> Option<u64> {
        self.ttl.map(|ttl| {
            let deadline = self.touched_at.saturating_add(ttl);
            deadline.saturating_sub(now)
        })
    }
}

// == Expiration Predicate ==
/// Returns true iff a record with the given timestamps has expired.
///
/// The check is skipped entirely (always false) when on-demand expiration
/// is disabled or when no TTL is set. Otherwise a record is expired once
/// `touched_at + ttl < now`; at exactly `touched_at + ttl == now` it is
/// still live.
///
/// Pure function over its arguments: `now` is injected so callers control
/// the clock, which keeps expiration checks deterministic under test.
/// The deadline saturates, so a TTL near `u64::MAX` means "never expires"
/// rather than wrapping around.
pub fn is_expired(now: u64, touched_at: u64, ttl: Option<u64>, ode_disabled: bool) -> bool {
    if ode_disabled {
        return false;
    }
    match ttl {
        Some(ttl) => touched_at.saturating_add(ttl) < now,
        None => false,
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}
