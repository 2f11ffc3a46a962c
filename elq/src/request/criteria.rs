//! Criteria model: the compiled filter-predicate tree
//!
//! Criteria are immutable value types built once during compilation. The
//! closed enum keeps the formatter's dispatch exhaustive: a new criteria
//! kind fails to compile until every match arm handles it.

use crate::error::{Error, Result};
use crate::value::Scalar;

/// A node in the compiled filter-predicate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    /// Exact single-value match on a field.
    Term { field: String, value: Scalar },
    /// Match any of a set of values. Construction dedups and collapses a
    /// single distinct value down to [`Criteria::Term`].
    Terms { field: String, values: Vec<Scalar> },
    /// Bounded comparison. The sub-kind is decided once from the first
    /// bound's value, not re-derived per compile.
    Range {
        field: String,
        kind: RangeKind,
        bounds: Vec<RangeBound>,
    },
    Prefix { field: String, prefix: String },
    Regexp { field: String, pattern: String },
    Not(Box<Criteria>),
    /// Engine query-string syntax over an optional field list.
    QueryString { query: String, fields: Vec<String> },
    MatchAll,
    Bool {
        should: Vec<Criteria>,
        must: Vec<Criteria>,
        must_not: Vec<Criteria>,
    },
    And(Vec<Criteria>),
    Or(Vec<Criteria>),
}

/// Which range query the engine should run for a [`Criteria::Range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    Temporal,
    Geo,
    Numeric,
    Text,
}

/// Comparison direction for one range bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeComparison {
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl RangeComparison {
    /// Wire key inside a range query body.
    pub fn key(&self) -> &'static str {
        match self {
            RangeComparison::GreaterThan => "gt",
            RangeComparison::GreaterThanOrEqual => "gte",
            RangeComparison::LessThan => "lt",
            RangeComparison::LessThanOrEqual => "lte",
        }
    }
}

/// One comparison/value pair in a range criteria.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeBound {
    pub comparison: RangeComparison,
    pub value: Scalar,
}

impl RangeBound {
    pub fn new(comparison: RangeComparison, value: Scalar) -> Self {
        Self { comparison, value }
    }
}

impl Criteria {
    pub fn term(field: impl Into<String>, value: Scalar) -> Result<Criteria> {
        let field = not_blank("field", field.into())?;
        Ok(Criteria::Term { field, value })
    }

    /// Build a `Terms` or `Term` criteria depending on how many distinct
    /// values remain after flattening nested arrays and deduplicating.
    pub fn terms_or_term(field: impl Into<String>, values: Vec<Scalar>) -> Result<Criteria> {
        let field = not_blank("field", field.into())?;

        let mut distinct: Vec<Scalar> = Vec::new();
        for value in values {
            match value {
                Scalar::Json(serde_json::Value::Array(items)) => {
                    for item in items {
                        let scalar = Scalar::Json(item);
                        if !distinct.contains(&scalar) {
                            distinct.push(scalar);
                        }
                    }
                }
                other => {
                    if !distinct.contains(&other) {
                        distinct.push(other);
                    }
                }
            }
        }

        if distinct.is_empty() {
            return Err(Error::InvalidArgument("values must not be empty".into()));
        }

        if distinct.len() == 1 {
            let value = distinct.remove(0);
            return Ok(Criteria::Term { field, value });
        }

        Ok(Criteria::Terms {
            field,
            values: distinct,
        })
    }

    /// Build a range criteria, deciding the range sub-kind from the first
    /// bound's value: temporal, geo distance, anything convertible to a
    /// double, or lexicographic text comparison.
    pub fn range(field: impl Into<String>, bounds: Vec<RangeBound>) -> Result<Criteria> {
        let field = not_blank("field", field.into())?;
        let first = bounds
            .first()
            .ok_or_else(|| Error::InvalidArgument("range requires at least one bound".into()))?;

        let kind = match &first.value {
            Scalar::Date(_) => RangeKind::Temporal,
            Scalar::Distance { .. } => RangeKind::Geo,
            value if value.as_f64().is_some() => RangeKind::Numeric,
            _ => RangeKind::Text,
        };

        Ok(Criteria::Range {
            field,
            kind,
            bounds,
        })
    }

    pub fn prefix(field: impl Into<String>, prefix: impl Into<String>) -> Result<Criteria> {
        let field = not_blank("field", field.into())?;
        Ok(Criteria::Prefix {
            field,
            prefix: prefix.into(),
        })
    }

    pub fn regexp(field: impl Into<String>, pattern: impl Into<String>) -> Result<Criteria> {
        let field = not_blank("field", field.into())?;
        Ok(Criteria::Regexp {
            field,
            pattern: pattern.into(),
        })
    }

    pub fn query_string(query: impl Into<String>, fields: Vec<String>) -> Result<Criteria> {
        let query = not_blank("query", query.into())?;
        Ok(Criteria::QueryString { query, fields })
    }

    pub fn not(inner: Criteria) -> Criteria {
        Criteria::Not(Box::new(inner))
    }

    /// Conjunction over criteria, collapsing to the single child when only
    /// one is given.
    pub fn and(mut items: Vec<Criteria>) -> Result<Criteria> {
        match items.len() {
            0 => Err(Error::InvalidArgument("and requires criteria".into())),
            1 => Ok(items.remove(0)),
            _ => Ok(Criteria::And(items)),
        }
    }

    /// Disjunction over criteria, collapsing to the single child when only
    /// one is given.
    pub fn or(mut items: Vec<Criteria>) -> Result<Criteria> {
        match items.len() {
            0 => Err(Error::InvalidArgument("or requires criteria".into())),
            1 => Ok(items.remove(0)),
            _ => Ok(Criteria::Or(items)),
        }
    }
}

fn not_blank(name: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{name} must not be blank")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    // ===================================================================
    // terms_or_term builder
    // ===================================================================

    #[test]
    fn test_single_value_collapses_to_term() {
        let c = Criteria::terms_or_term("status", vec![Scalar::Text("active".into())]).unwrap();
        assert_eq!(
            c,
            Criteria::Term {
                field: "status".into(),
                value: Scalar::Text("active".into())
            }
        );
    }

    #[test]
    fn test_duplicates_collapse_to_term() {
        let c = Criteria::terms_or_term(
            "id",
            vec![Scalar::Long(3), Scalar::Long(3), Scalar::Long(3)],
        )
        .unwrap();
        assert!(matches!(c, Criteria::Term { .. }));
    }

    #[test]
    fn test_distinct_values_build_terms() {
        let c = Criteria::terms_or_term("id", vec![Scalar::Long(1), Scalar::Long(2)]).unwrap();
        match c {
            Criteria::Terms { values, .. } => assert_eq!(values.len(), 2),
            _ => panic!("Expected Terms"),
        }
    }

    #[test]
    fn test_nested_arrays_are_flattened() {
        let c = Criteria::terms_or_term(
            "id",
            vec![Scalar::Json(json!([1, 2])), Scalar::Json(json!(2))],
        )
        .unwrap();
        match c {
            Criteria::Terms { values, .. } => assert_eq!(values.len(), 2),
            _ => panic!("Expected Terms"),
        }
    }

    #[test]
    fn test_empty_values_rejected() {
        let err = Criteria::terms_or_term("id", vec![]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_blank_field_rejected() {
        let err = Criteria::term("  ", Scalar::Long(1)).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    // ===================================================================
    // Range kind selection
    // ===================================================================

    #[test]
    fn test_range_kind_temporal() {
        let c = Criteria::range(
            "joined",
            vec![RangeBound::new(
                RangeComparison::GreaterThan,
                Scalar::Date(Utc.timestamp_millis_opt(0).unwrap()),
            )],
        )
        .unwrap();
        assert!(matches!(
            c,
            Criteria::Range {
                kind: RangeKind::Temporal,
                ..
            }
        ));
    }

    #[test]
    fn test_range_kind_numeric_for_long() {
        let c = Criteria::range(
            "id",
            vec![RangeBound::new(
                RangeComparison::GreaterThanOrEqual,
                Scalar::Long(10),
            )],
        )
        .unwrap();
        assert!(matches!(
            c,
            Criteria::Range {
                kind: RangeKind::Numeric,
                ..
            }
        ));
    }

    #[test]
    fn test_range_kind_geo() {
        let c = Criteria::range(
            "location",
            vec![RangeBound::new(
                RangeComparison::LessThan,
                Scalar::Distance {
                    value: 5.0,
                    unit: "km".into(),
                },
            )],
        )
        .unwrap();
        assert!(matches!(
            c,
            Criteria::Range {
                kind: RangeKind::Geo,
                ..
            }
        ));
    }

    #[test]
    fn test_range_kind_text_fallback() {
        let c = Criteria::range(
            "name",
            vec![RangeBound::new(
                RangeComparison::LessThanOrEqual,
                Scalar::Text("m".into()),
            )],
        )
        .unwrap();
        assert!(matches!(
            c,
            Criteria::Range {
                kind: RangeKind::Text,
                ..
            }
        ));
    }

    #[test]
    fn test_range_requires_bounds() {
        let err = Criteria::range("id", vec![]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    // ===================================================================
    // Compound collapsing
    // ===================================================================

    #[test]
    fn test_and_collapses_single_child() {
        let inner = Criteria::term("id", Scalar::Long(1)).unwrap();
        let c = Criteria::and(vec![inner.clone()]).unwrap();
        assert_eq!(c, inner);
    }

    #[test]
    fn test_or_keeps_multiple_children() {
        let a = Criteria::term("id", Scalar::Long(1)).unwrap();
        let b = Criteria::term("id", Scalar::Long(2)).unwrap();
        let c = Criteria::or(vec![a, b]).unwrap();
        assert!(matches!(c, Criteria::Or(items) if items.len() == 2));
    }

    #[test]
    fn test_empty_compound_rejected() {
        assert!(Criteria::and(vec![]).is_err());
        assert!(Criteria::or(vec![]).is_err());
    }
}
