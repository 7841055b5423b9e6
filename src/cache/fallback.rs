//! Fallback Resolver Module
//!
//! Decides how to produce a value for a cache miss from a configured or
//! per-call fallback callable. The callable's shape (its arity) is fixed
//! when the fallback is constructed, so dispatch here is a plain match
//! rather than a per-call inspection.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;

// == Callable Shapes ==
/// Fallback taking no arguments.
pub type NullaryFn = Arc<dyn Fn() -> Result<Value> + Send + Sync>;
/// Fallback taking just the missed key.
pub type KeyedFn = Arc<dyn Fn(&str) -> Result<Value> + Send + Sync>;
/// Fallback taking the missed key plus the configured extra arguments.
pub type KeyedWithArgsFn = Arc<dyn Fn(&str, &[Value]) -> Result<Value> + Send + Sync>;

// == Fallback ==
/// A value-producing callable for cache misses, tagged by shape.
///
/// `KeyedWithArgs` records how many extra arguments the callable expects;
/// it is only invoked when that count matches the configured
/// `fallback_args` list, mirroring an arity check done once at
/// configuration time.
#[derive(Clone)]
pub enum Fallback {
    /// Invoked with no arguments
    Nullary(NullaryFn),
    /// Invoked with the missed key
    Keyed(KeyedFn),
    /// Invoked with the missed key followed by the configured extra
    /// arguments, in order
    KeyedWithArgs {
        func: KeyedWithArgsFn,
        /// Number of extra arguments the callable expects after the key
        extra_args: usize,
    },
}

impl Fallback {
    // == Constructors ==
    /// Wraps a callable invoked with no arguments.
    pub fn nullary(func: impl Fn() -> Result<Value> + Send + Sync + 'static) -> Self {
        Fallback::Nullary(Arc::new(func))
    }

    /// Wraps a callable invoked with the missed key.
    pub fn keyed(func: impl Fn(&str) -> Result<Value> + Send + Sync + 'static) -> Self {
        Fallback::Keyed(Arc::new(func))
    }

    /// Wraps a callable invoked with the key plus `extra_args` configured
    /// arguments.
    pub fn keyed_with_args(
        func: impl Fn(&str, &[Value]) -> Result<Value> + Send + Sync + 'static,
        extra_args: usize,
    ) -> Self {
        Fallback::KeyedWithArgs {
            func: Arc::new(func),
            extra_args,
        }
    }

    // == Arity ==
    /// Total number of arguments the callable expects.
    pub fn arity(&self) -> usize {
        match self {
            Fallback::Nullary(_) => 0,
            Fallback::Keyed(_) => 1,
            Fallback::KeyedWithArgs { extra_args, .. } => 1 + extra_args,
        }
    }
}

impl fmt::Debug for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fallback::Nullary(_) => write!(f, "Fallback::Nullary"),
            Fallback::Keyed(_) => write!(f, "Fallback::Keyed"),
            Fallback::KeyedWithArgs { extra_args, .. } => {
                write!(f, "Fallback::KeyedWithArgs({})", extra_args)
            }
        }
    }
}

// == Fallback Outcome ==
/// Result of fallback resolution, tagged by provenance.
///
/// Callers branch on the tag: `NotLoaded` and `Static` may carry the same
/// default value, but only `Loaded` means a callable actually ran.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackOutcome {
    /// The chosen callable ran and produced this value
    Loaded(Value),
    /// A callable was chosen but its shape did not fit the configured
    /// arguments; carries the caller-supplied default
    NotLoaded(Value),
    /// No callable was configured at all; carries the caller-supplied
    /// default
    Static(Value),
}

impl FallbackOutcome {
    /// Consumes the outcome, returning the carried value.
    pub fn into_value(self) -> Value {
        match self {
            FallbackOutcome::Loaded(value)
            | FallbackOutcome::NotLoaded(value)
            | FallbackOutcome::Static(value) => value,
        }
    }

    /// Returns true when a callable actually produced the value.
    pub fn was_loaded(&self) -> bool {
        matches!(self, FallbackOutcome::Loaded(_))
    }
}

// == Resolution ==
/// Resolves a value for a missed key.
///
/// A per-call `override_fallback` takes priority over the cache-wide
/// `configured` fallback. The chosen callable is invoked according to its
/// shape: nullary with nothing, keyed with the key, keyed-with-args with
/// the key followed by all of `fallback_args` when the declared count
/// matches the list length. A count mismatch yields `NotLoaded(default)`
/// without invoking anything; no callable at all yields
/// `Static(default)`.
///
/// Errors returned by the callable propagate unmodified: swallowing a
/// fallback's error would hide a genuine application bug.
pub fn resolve_fallback(
    override_fallback: Option<&Fallback>,
    configured: Option<&Fallback>,
    key: &str,
    fallback_args: &[Value],
    default: Value,
) -> Result<FallbackOutcome> {
    let Some(fallback) = override_fallback.or(configured) else {
        return Ok(FallbackOutcome::Static(default));
    };

    match fallback {
        Fallback::Nullary(func) => Ok(FallbackOutcome::Loaded(func()?)),
        Fallback::Keyed(func) => Ok(FallbackOutcome::Loaded(func(key)?)),
        Fallback::KeyedWithArgs { func, extra_args } if *extra_args == fallback_args.len() => {
            Ok(FallbackOutcome::Loaded(func(key, fallback_args)?))
        }
        Fallback::KeyedWithArgs { .. } => Ok(FallbackOutcome::NotLoaded(default)),
    }
}
