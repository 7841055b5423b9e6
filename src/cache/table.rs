//! Tuple Table Module
//!
//! Minimal in-memory table engine over fixed-width cache records. Executes
//! selection specs produced by the match-spec compiler: binds the pattern
//! against each stored record, evaluates guards with a scan-time clock
//! value, and returns the projected rows.

use std::collections::HashMap;

use serde_json::Value;

use crate::cache::matchspec::{Guard, SelectionSpec, Term};
use crate::cache::record::Record;

// == Tuple Table ==
/// In-memory storage of cache records, keyed by the record key.
#[derive(Debug, Default)]
pub struct TupleTable {
    records: HashMap<String, Record>,
}

impl TupleTable {
    // == Constructor ==
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    // == Insert ==
    /// Inserts a record, replacing any existing record with the same key.
    ///
    /// Returns the replaced record, if there was one.
    pub fn insert(&mut self, record: Record) -> Option<Record> {
        self.records.insert(record.key.clone(), record)
    }

    // == Lookup ==
    /// Returns the record stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Record> {
        self.records.get(key)
    }

    // == Remove ==
    /// Removes and returns the record stored under `key`, if any.
    pub fn remove(&mut self, key: &str) -> Option<Record> {
        self.records.remove(key)
    }

    // == Select ==
    /// Runs a selection spec against every stored record.
    ///
    /// A record matches when the pattern binds and all guards evaluate to
    /// true with `now` bound to the scan clock. Each matching record
    /// yields one projected row. Row order is unspecified.
    pub fn select(&self, spec: &SelectionSpec, now: u64) -> Vec<Vec<Value>> {
        self.records
            .values()
            .filter(|record| matches(spec, record, now))
            .map(|record| project(spec, record))
            .collect()
    }

    // == Take ==
    /// Like [`select`](Self::select), but removes the matching records.
    ///
    /// Returns the projected rows of the removed records.
    pub fn take(&mut self, spec: &SelectionSpec, now: u64) -> Vec<Vec<Value>> {
        let matched: Vec<String> = self
            .records
            .values()
            .filter(|record| matches(spec, record, now))
            .map(|record| record.key.clone())
            .collect();

        matched
            .into_iter()
            .filter_map(|key| self.records.remove(&key))
            .map(|record| project(spec, &record))
            .collect()
    }

    // == Length ==
    /// Returns the number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    // == Is Empty ==
    /// Returns true if the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// == Matching ==
/// Checks the pattern binding and every guard for one record.
fn matches(spec: &SelectionSpec, record: &Record, now: u64) -> bool {
    pattern_binds(&spec.pattern, record)
        && spec
            .guards
            .iter()
            .all(|guard| is_truthy(&eval_guard(guard, record, now)))
}

/// Binds the positional pattern against a record.
///
/// Slot and field terms always bind (they name the position itself); a
/// literal in a pattern position must equal the record's value at that
/// position; a tuple never matches a scalar field.
fn pattern_binds(pattern: &[Term], record: &Record) -> bool {
    pattern.iter().enumerate().all(|(i, term)| match term {
        Term::Slot(_) | Term::Field(_) => true,
        Term::Lit(value) => record.slot(i + 1) == *value,
        Term::Tuple(_) => false,
    })
}

/// Projects the return terms for one matching record.
fn project(spec: &SelectionSpec, record: &Record) -> Vec<Value> {
    spec.project
        .iter()
        .map(|term| eval_term(term, record))
        .collect()
}

// == Guard Interpreter ==
/// Evaluates a guard expression against a bound record.
///
/// Permissive by construction: arithmetic over non-numbers yields null,
/// ordered comparisons involving null are false, and non-boolean operands
/// of `And`/`Or` count as false. Malformed guards therefore select
/// nothing instead of failing the scan.
fn eval_guard(guard: &Guard, record: &Record, now: u64) -> Value {
    match guard {
        Guard::Term(term) => eval_term(term, record),
        Guard::Now => Value::from(now),
        Guard::Eq(lhs, rhs) => {
            Value::Bool(eval_guard(lhs, record, now) == eval_guard(rhs, record, now))
        }
        Guard::Ne(lhs, rhs) => {
            Value::Bool(eval_guard(lhs, record, now) != eval_guard(rhs, record, now))
        }
        Guard::Lt(lhs, rhs) => compare(
            &eval_guard(lhs, record, now),
            &eval_guard(rhs, record, now),
            |a, b| a < b,
        ),
        Guard::Gt(lhs, rhs) => compare(
            &eval_guard(lhs, record, now),
            &eval_guard(rhs, record, now),
            |a, b| a > b,
        ),
        Guard::Ge(lhs, rhs) => compare(
            &eval_guard(lhs, record, now),
            &eval_guard(rhs, record, now),
            |a, b| a >= b,
        ),
        Guard::Add(lhs, rhs) => add(
            &eval_guard(lhs, record, now),
            &eval_guard(rhs, record, now),
        ),
        Guard::And(lhs, rhs) => Value::Bool(
            is_truthy(&eval_guard(lhs, record, now)) && is_truthy(&eval_guard(rhs, record, now)),
        ),
        Guard::Or(lhs, rhs) => Value::Bool(
            is_truthy(&eval_guard(lhs, record, now)) || is_truthy(&eval_guard(rhs, record, now)),
        ),
    }
}

/// Evaluates a term leaf against a bound record.
fn eval_term(term: &Term, record: &Record) -> Value {
    match term {
        Term::Field(field) => record.slot(field.slot()),
        Term::Slot(slot) => record.slot(*slot),
        Term::Lit(value) => value.clone(),
        Term::Tuple(items) => {
            Value::Array(items.iter().map(|item| eval_term(item, record)).collect())
        }
    }
}

fn compare(lhs: &Value, rhs: &Value, op: impl Fn(f64, f64) -> bool) -> Value {
    match (lhs.as_f64(), rhs.as_f64()) {
        (Some(a), Some(b)) => Value::Bool(op(a, b)),
        _ => Value::Bool(false),
    }
}

fn add(lhs: &Value, rhs: &Value) -> Value {
    // Integer timestamps stay integers; mixed or fractional operands fall
    // back to f64. Deadline sums saturate rather than wrap.
    if let (Some(a), Some(b)) = (lhs.as_u64(), rhs.as_u64()) {
        return Value::from(a.saturating_add(b));
    }
    match (lhs.as_f64(), rhs.as_f64()) {
        (Some(a), Some(b)) => Value::from(a + b),
        _ => Value::Null,
    }
}

fn is_truthy(value: &Value) -> bool {
    matches!(value, Value::Bool(true))
}
