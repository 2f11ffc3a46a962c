//! Rebinds predicate expressions to criteria
//!
//! Field references resolve through the mapping exactly once, here. Shapes
//! outside the recognized vocabulary fail with `UnsupportedCriteria` at
//! compile time rather than silently matching nothing.

use crate::error::{Error, Result};
use crate::mapping::Mapping;
use crate::plan::{CompareOp, Expr};
use crate::request::criteria::{Criteria, RangeBound, RangeComparison};
use crate::value::{Scalar, ValueKind};

pub fn rebind(mapping: &dyn Mapping, source: &str, expr: &Expr) -> Result<Criteria> {
    match expr {
        Expr::Compare { field, op, value } => {
            let name = mapping.field_name(source, field);
            match op {
                CompareOp::Eq => Criteria::term(name, value.clone()),
                CompareOp::Ne => Ok(Criteria::not(Criteria::term(name, value.clone())?)),
                CompareOp::Gt => bound(name, RangeComparison::GreaterThan, value),
                CompareOp::Gte => bound(name, RangeComparison::GreaterThanOrEqual, value),
                CompareOp::Lt => bound(name, RangeComparison::LessThan, value),
                CompareOp::Lte => bound(name, RangeComparison::LessThanOrEqual, value),
            }
        }

        // A bare boolean member in predicate position means "is true"
        Expr::Member(field) if field.kind == ValueKind::Bool => {
            Criteria::term(mapping.field_name(source, field), Scalar::Bool(true))
        }

        // Constant predicates: always-true matches everything, always-false
        // matches nothing
        Expr::Constant(Scalar::Bool(true)) => Ok(Criteria::MatchAll),
        Expr::Constant(Scalar::Bool(false)) => Ok(Criteria::not(Criteria::MatchAll)),

        Expr::In { field, values } => {
            Criteria::terms_or_term(mapping.field_name(source, field), values.clone())
        }

        Expr::Prefix { field, value } => {
            Criteria::prefix(mapping.field_name(source, field), value)
        }

        Expr::Regexp { field, pattern } => {
            Criteria::regexp(mapping.field_name(source, field), pattern)
        }

        Expr::QueryString { query, fields } => Criteria::query_string(query, fields.clone()),

        Expr::MatchAll => Ok(Criteria::MatchAll),

        Expr::And(items) => Criteria::and(
            items
                .iter()
                .map(|e| rebind(mapping, source, e))
                .collect::<Result<Vec<_>>>()?,
        ),

        Expr::Or(items) => Criteria::or(
            items
                .iter()
                .map(|e| rebind(mapping, source, e))
                .collect::<Result<Vec<_>>>()?,
        ),

        Expr::Not(inner) => Ok(Criteria::not(rebind(mapping, source, inner)?)),

        other => Err(Error::UnsupportedCriteria(format!(
            "expression not usable as a predicate: {other:?}"
        ))),
    }
}

fn bound(name: String, comparison: RangeComparison, value: &Scalar) -> Result<Criteria> {
    Criteria::range(name, vec![RangeBound::new(comparison, value.clone())])
}
