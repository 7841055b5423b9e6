//! Match-Spec Compiler Module
//!
//! Compiles symbolic field references and guard expression trees into the
//! positional selection specs executed by the tuple table engine. This is
//! a thin assembler: guards are not validated here, malformed expressions
//! surface at scan time.

use serde_json::Value;

use crate::cache::record::RECORD_FIELDS;

// == Field References ==
/// Symbolic name for one of the four record fields.
///
/// The slot mapping is fixed: `Key` -> 1, `Touched` -> 2, `Ttl` -> 3,
/// `Value` -> 4. Everything downstream of the compiler works in slot
/// numbers, so field offsets live in exactly one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Primary lookup key (slot 1)
    Key,
    /// Touched-at timestamp in milliseconds (slot 2)
    Touched,
    /// TTL in milliseconds, null when absent (slot 3)
    Ttl,
    /// Stored payload (slot 4)
    Value,
}

impl Field {
    /// Returns the 1-based positional slot for this field.
    pub fn slot(self) -> usize {
        match self {
            Field::Key => 1,
            Field::Touched => 2,
            Field::Ttl => 3,
            Field::Value => 4,
        }
    }
}

// == Terms ==
/// Leaf language shared by projections and guards.
///
/// A term is either a symbolic field reference, an already-positional slot
/// reference, a literal, or a nested tuple of terms. Projections may
/// request several fields at once as a tuple.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// Symbolic field reference, resolved to a slot before execution
    Field(Field),
    /// Positional slot reference (1-based)
    Slot(usize),
    /// Literal value, passed through untouched
    Lit(Value),
    /// Nested tuple of terms, resolved element-wise
    Tuple(Vec<Term>),
}

impl Term {
    /// Builds a literal term from anything serializable to JSON.
    pub fn lit(value: impl Into<Value>) -> Self {
        Term::Lit(value.into())
    }

    // == Resolve ==
    /// Resolves symbolic field references to positional slot references.
    ///
    /// Recurses into tuples, preserving their shape. Slots and literals
    /// pass through unchanged: the same resolver serves projections that
    /// mix field references with literal values.
    pub fn resolve(self) -> Term {
        match self {
            Term::Field(field) => Term::Slot(field.slot()),
            Term::Tuple(items) => Term::Tuple(items.into_iter().map(Term::resolve).collect()),
            other => other,
        }
    }
}

impl From<Field> for Term {
    fn from(field: Field) -> Self {
        Term::Field(field)
    }
}

impl From<Value> for Term {
    fn from(value: Value) -> Self {
        Term::Lit(value)
    }
}

// == Guard Expressions ==
/// A pure boolean/arithmetic expression tree over record slots.
///
/// Guards are data, not behavior: the table engine interprets them at
/// scan time against each bound record plus the scan's current-time
/// value. `Now` is a placeholder for that value, so a long-running scan
/// keeps reflecting live/expired status as time advances.
#[derive(Debug, Clone, PartialEq)]
pub enum Guard {
    /// Equality comparison
    Eq(Box<Guard>, Box<Guard>),
    /// Inequality comparison
    Ne(Box<Guard>, Box<Guard>),
    /// Numeric less-than
    Lt(Box<Guard>, Box<Guard>),
    /// Numeric greater-than
    Gt(Box<Guard>, Box<Guard>),
    /// Numeric greater-or-equal
    Ge(Box<Guard>, Box<Guard>),
    /// Numeric addition
    Add(Box<Guard>, Box<Guard>),
    /// Boolean conjunction
    And(Box<Guard>, Box<Guard>),
    /// Boolean disjunction
    Or(Box<Guard>, Box<Guard>),
    /// Term leaf: field reference, slot reference, or literal
    Term(Term),
    /// Scan-time current timestamp in milliseconds
    Now,
}

impl Guard {
    pub fn eq(lhs: impl Into<Guard>, rhs: impl Into<Guard>) -> Guard {
        Guard::Eq(Box::new(lhs.into()), Box::new(rhs.into()))
    }

    pub fn ne(lhs: impl Into<Guard>, rhs: impl Into<Guard>) -> Guard {
        Guard::Ne(Box::new(lhs.into()), Box::new(rhs.into()))
    }

    pub fn lt(lhs: impl Into<Guard>, rhs: impl Into<Guard>) -> Guard {
        Guard::Lt(Box::new(lhs.into()), Box::new(rhs.into()))
    }

    pub fn gt(lhs: impl Into<Guard>, rhs: impl Into<Guard>) -> Guard {
        Guard::Gt(Box::new(lhs.into()), Box::new(rhs.into()))
    }

    pub fn ge(lhs: impl Into<Guard>, rhs: impl Into<Guard>) -> Guard {
        Guard::Ge(Box::new(lhs.into()), Box::new(rhs.into()))
    }

    pub fn add(lhs: impl Into<Guard>, rhs: impl Into<Guard>) -> Guard {
        Guard::Add(Box::new(lhs.into()), Box::new(rhs.into()))
    }

    pub fn and(lhs: impl Into<Guard>, rhs: impl Into<Guard>) -> Guard {
        Guard::And(Box::new(lhs.into()), Box::new(rhs.into()))
    }

    pub fn or(lhs: impl Into<Guard>, rhs: impl Into<Guard>) -> Guard {
        Guard::Or(Box::new(lhs.into()), Box::new(rhs.into()))
    }
}

impl From<Term> for Guard {
    fn from(term: Term) -> Self {
        Guard::Term(term)
    }
}

impl From<Field> for Guard {
    fn from(field: Field) -> Self {
        Guard::Term(Term::Field(field))
    }
}

impl From<Value> for Guard {
    fn from(value: Value) -> Self {
        Guard::Term(Term::Lit(value))
    }
}

// == Normalization Wrappers ==
/// A projection list; built from a bare term or an explicit list.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection(pub Vec<Term>);

impl From<Term> for Projection {
    fn from(term: Term) -> Self {
        Projection(vec![term])
    }
}

impl From<Field> for Projection {
    fn from(field: Field) -> Self {
        Projection(vec![Term::Field(field)])
    }
}

impl From<Vec<Term>> for Projection {
    fn from(terms: Vec<Term>) -> Self {
        Projection(terms)
    }
}

/// A guard list; built from a bare guard or an explicit list.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardList(pub Vec<Guard>);

impl From<Guard> for GuardList {
    fn from(guard: Guard) -> Self {
        GuardList(vec![guard])
    }
}

impl From<Vec<Guard>> for GuardList {
    fn from(guards: Vec<Guard>) -> Self {
        GuardList(guards)
    }
}

// == Selection Spec ==
/// A fully assembled selection: positional pattern, ANDed guards, and a
/// projection of return terms.
///
/// Built fresh per query and handed straight to the table engine; never
/// persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionSpec {
    /// Positional pattern binding each record field to its slot
    pub pattern: [Term; RECORD_FIELDS],
    /// Guard expressions, all of which must hold for a row to match
    pub guards: Vec<Guard>,
    /// Return projection, in resolved (positional/literal) form
    pub project: Vec<Term>,
}

// == Assembly ==
/// Assembles a selection spec from a return projection and guards.
///
/// Normalizes a bare term into a single-element projection and a bare
/// guard into a single-element list, resolves symbolic field references
/// in the projection, and pairs both with the fixed positional pattern.
/// Every query funnels through here; there are no caller special cases.
pub fn build_selection(
    return_spec: impl Into<Projection>,
    guards: impl Into<GuardList>,
) -> SelectionSpec {
    let Projection(terms) = return_spec.into();
    let GuardList(guards) = guards.into();

    SelectionSpec {
        pattern: [Term::Slot(1), Term::Slot(2), Term::Slot(3), Term::Slot(4)],
        guards,
        project: terms.into_iter().map(Term::resolve).collect(),
    }
}

/// Builds the "all live rows" selection.
///
/// A row is live when it has no TTL or its deadline has not yet passed:
/// `ttl == null OR touched + ttl >= now`, with `now` evaluated by the
/// engine at scan time rather than precomputed here.
pub fn select_live(return_spec: impl Into<Projection>) -> SelectionSpec {
    let guard = Guard::or(
        Guard::eq(Field::Ttl, Value::Null),
        Guard::ge(Guard::add(Field::Touched, Field::Ttl), Guard::Now),
    );
    build_selection(return_spec, guard)
}

/// Builds the "all expired rows" selection.
///
/// Exact negation of [`select_live`]: `ttl != null AND touched + ttl < now`.
/// No row can match both, and every row matches exactly one.
pub fn select_expired(return_spec: impl Into<Projection>) -> SelectionSpec {
    let guard = Guard::and(
        Guard::ne(Field::Ttl, Value::Null),
        Guard::lt(Guard::add(Field::Touched, Field::Ttl), Guard::Now),
    );
    build_selection(return_spec, guard)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_slot_mapping() {
        assert_eq!(Field::Key.slot(), 1);
        assert_eq!(Field::Touched.slot(), 2);
        assert_eq!(Field::Ttl.slot(), 3);
        assert_eq!(Field::Value.slot(), 4);
    }

    #[test]
    fn test_resolve_single_field() {
        assert_eq!(Term::Field(Field::Key).resolve(), Term::Slot(1));
        assert_eq!(Term::Field(Field::Value).resolve(), Term::Slot(4));
    }

    #[test]
    fn test_resolve_tuple_preserves_shape() {
        let term = Term::Tuple(vec![
            Term::Field(Field::Key),
            Term::Tuple(vec![Term::Field(Field::Ttl), Term::lit("x")]),
            Term::Field(Field::Value),
        ]);

        let resolved = term.resolve();

        assert_eq!(
            resolved,
            Term::Tuple(vec![
                Term::Slot(1),
                Term::Tuple(vec![Term::Slot(3), Term::lit("x")]),
                Term::Slot(4),
            ])
        );
    }

    #[test]
    fn test_resolve_passes_through_slots_and_literals() {
        assert_eq!(Term::Slot(2).resolve(), Term::Slot(2));
        assert_eq!(Term::lit(7).resolve(), Term::lit(7));
        assert_eq!(Term::Lit(json!("touched")).resolve(), Term::Lit(json!("touched")));
    }

    #[test]
    fn test_build_selection_bare_field_no_guards() {
        let spec = build_selection(Field::Value, Vec::new());

        assert_eq!(spec.project, vec![Term::Slot(4)]);
        assert!(spec.guards.is_empty());
        assert_eq!(
            spec.pattern,
            [Term::Slot(1), Term::Slot(2), Term::Slot(3), Term::Slot(4)]
        );
    }

    #[test]
    fn test_build_selection_wraps_bare_guard() {
        let guard = Guard::gt(Field::Touched, Term::lit(0));
        let spec = build_selection(Field::Key, guard.clone());

        assert_eq!(spec.guards, vec![guard]);
    }

    #[test]
    fn test_build_selection_resolves_projection_list() {
        let spec = build_selection(
            vec![Term::Field(Field::Key), Term::Field(Field::Touched), Term::lit(1)],
            Vec::new(),
        );

        assert_eq!(spec.project, vec![Term::Slot(1), Term::Slot(2), Term::lit(1)]);
    }

    #[test]
    fn test_select_live_guard_shape() {
        let spec = select_live(Field::Key);

        assert_eq!(spec.project, vec![Term::Slot(1)]);
        assert_eq!(
            spec.guards,
            vec![Guard::or(
                Guard::eq(Field::Ttl, Value::Null),
                Guard::ge(Guard::add(Field::Touched, Field::Ttl), Guard::Now),
            )]
        );
    }

    #[test]
    fn test_select_expired_guard_shape() {
        let spec = select_expired(Field::Key);

        assert_eq!(
            spec.guards,
            vec![Guard::and(
                Guard::ne(Field::Ttl, Value::Null),
                Guard::lt(Guard::add(Field::Touched, Field::Ttl), Guard::Now),
            )]
        );
    }

    #[test]
    fn test_live_and_expired_share_pattern() {
        let live = select_live(Field::Key);
        let expired = select_expired(Field::Key);

        assert_eq!(live.pattern, expired.pattern);
        assert_eq!(live.project, expired.project);
    }
}
