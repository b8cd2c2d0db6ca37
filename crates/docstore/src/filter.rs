//! Store-agnostic query predicates.
//!
//! Filters are plain values: they can be built, compared and evaluated in
//! memory without a store, and a backend translates them into its own query
//! language.

use std::cmp::Ordering;

use crate::document::{Document, FieldValue};

/// Predicate over a single document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Matches every document.
    All,
    /// `field == value`. Comparing against `Null` also matches a missing field.
    Eq(String, FieldValue),
    /// `field < value`. Never matches a missing/null field or a value of another kind.
    Lt(String, FieldValue),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    /// Shorthand for `eq(field, Null)`: the field is absent.
    pub fn is_absent(field: impl Into<String>) -> Self {
        Filter::Eq(field.into(), FieldValue::Null)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Filter::Lt(field.into(), value.into())
    }

    /// Conjunction. Nested conjunctions are flattened and `All` clauses dropped;
    /// an empty conjunction is `All`, a single clause is returned as-is.
    pub fn and(clauses: impl IntoIterator<Item = Filter>) -> Self {
        let mut flat = Vec::new();
        for clause in clauses {
            match clause {
                Filter::All => {}
                Filter::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Filter::All,
            1 => flat.remove(0),
            _ => Filter::And(flat),
        }
    }

    /// Disjunction. Any `All` clause makes the whole disjunction `All`; an empty
    /// disjunction matches nothing.
    pub fn or(clauses: impl IntoIterator<Item = Filter>) -> Self {
        let mut flat = Vec::new();
        for clause in clauses {
            match clause {
                Filter::All => return Filter::All,
                Filter::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            1 => flat.remove(0),
            _ => Filter::Or(flat),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Filter::All)
    }

    /// Evaluate against a document.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, FieldValue::Null) => doc.get(field).is_none_or(FieldValue::is_null),
            Filter::Eq(field, value) => doc.get(field) == Some(value),
            Filter::Lt(field, value) => doc
                .get(field)
                .and_then(|actual| actual.compare(value))
                .is_some_and(|ord| ord == Ordering::Less),
            Filter::And(clauses) => clauses.iter().all(|c| c.matches(doc)),
            Filter::Or(clauses) => clauses.iter().any(|c| c.matches(doc)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn doc(pairs: &[(&str, FieldValue)]) -> Document {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn eq_null_matches_missing_and_null() {
        let f = Filter::is_absent("lockOwner");
        assert!(f.matches(&doc(&[])));
        assert!(f.matches(&doc(&[("lockOwner", FieldValue::Null)])));
        assert!(!f.matches(&doc(&[("lockOwner", "w1".into())])));
    }

    #[test]
    fn lt_ignores_missing_and_mismatched_kinds() {
        let now = Utc::now();
        let f = Filter::lt("lockExpirationTime", now);
        assert!(!f.matches(&doc(&[])));
        assert!(!f.matches(&doc(&[("lockExpirationTime", FieldValue::Null)])));
        assert!(!f.matches(&doc(&[("lockExpirationTime", FieldValue::Int(0))])));
        assert!(f.matches(&doc(&[(
            "lockExpirationTime",
            (now - Duration::seconds(1)).into()
        )])));
        assert!(!f.matches(&doc(&[("lockExpirationTime", now.into())])));
    }

    #[test]
    fn and_flattens_and_drops_all() {
        let a = Filter::eq("a", 1i64);
        let b = Filter::eq("b", 2i64);
        assert_eq!(Filter::and([]), Filter::All);
        assert_eq!(Filter::and([Filter::All, a.clone()]), a);
        assert_eq!(
            Filter::and([Filter::and([a.clone(), b.clone()]), Filter::All, a.clone()]),
            Filter::And(vec![a.clone(), b, a])
        );
    }

    #[test]
    fn or_with_all_is_all() {
        assert_eq!(Filter::or([Filter::eq("a", 1i64), Filter::All]), Filter::All);
    }

    #[test]
    fn nested_combinators_evaluate() {
        let f = Filter::and([
            Filter::eq("scopeType", "cmmn"),
            Filter::or([Filter::eq("retries", 0i64), Filter::is_absent("lockOwner")]),
        ]);
        assert!(f.matches(&doc(&[("scopeType", "cmmn".into()), ("retries", 3i64.into())])));
        assert!(!f.matches(&doc(&[
            ("scopeType", "cmmn".into()),
            ("retries", 3i64.into()),
            ("lockOwner", "w".into())
        ])));
        assert!(!f.matches(&doc(&[("retries", 0i64.into())])));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn clause() -> impl Strategy<Value = Filter> {
            prop_oneof![
                (0i64..4).prop_map(|v| Filter::eq("a", v)),
                (0i64..4).prop_map(|v| Filter::lt("b", v)),
                Just(Filter::is_absent("c")),
                Just(Filter::All),
            ]
        }

        fn document() -> impl Strategy<Value = Document> {
            (
                proptest::option::of(0i64..4),
                proptest::option::of(0i64..4),
                proptest::option::of(0i64..4),
            )
                .prop_map(|(a, b, c)| {
                    let mut d = Document::new();
                    for (k, v) in [("a", a), ("b", b), ("c", c)] {
                        if let Some(v) = v {
                            d.insert(k.to_string(), FieldValue::Int(v));
                        }
                    }
                    d
                })
        }

        proptest! {
            /// Property: the `and` combinator agrees with evaluating every clause.
            #[test]
            fn and_is_conjunction(clauses in proptest::collection::vec(clause(), 0..5), d in document()) {
                let expected = clauses.iter().all(|c| c.matches(&d));
                prop_assert_eq!(Filter::and(clauses).matches(&d), expected);
            }

            /// Property: the `or` combinator agrees with evaluating any clause.
            #[test]
            fn or_is_disjunction(clauses in proptest::collection::vec(clause(), 1..5), d in document()) {
                let expected = clauses.iter().any(|c| c.matches(&d));
                prop_assert_eq!(Filter::or(clauses).matches(&d), expected);
            }
        }
    }
}
