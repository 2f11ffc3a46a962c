//! Flattened aggregate rows and the projector that shapes them
//!
//! The materializer flattens nested bucket trees into rows; each row is a
//! composite key plus the aggregate fields observed on the way down. The
//! projector then evaluates the rebound projection shape against one row at
//! a time, applying per-kind zero values for lookups the response never
//! answered.

use serde_json::Value;

use crate::error::Result;
use crate::response::types::AggregateResult;
use crate::value::{parse_value, Scalar, ValueKind};

/// One decoded aggregate token, addressed by facet name and operation.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateField {
    pub name: String,
    pub operation: String,
    pub token: Value,
}

impl AggregateField {
    pub fn new(name: impl Into<String>, operation: impl Into<String>, token: Value) -> Self {
        Self {
            name: name.into(),
            operation: operation.into(),
            token,
        }
    }
}

/// Ordered grouping-key components of one flattened row. Single-field
/// grouping has one component; composite keys keep one per level.
pub type CompositeKey = Vec<(String, Value)>;

/// One row produced by response flattening.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateRow {
    Term(AggregateTermRow),
    Statistical(AggregateStatisticalRow),
}

/// A row flattened out of a terms bucket tree.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateTermRow {
    pub key: CompositeKey,
    pub fields: Vec<AggregateField>,
}

/// A row over the whole matched set, with no grouping buckets. Holds the
/// named aggregation results directly.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateStatisticalRow {
    /// Constant grouping key supplied by the caller, if any.
    pub key: Option<Value>,
    pub facets: Vec<(String, AggregateResult)>,
}

impl AggregateRow {
    /// Look up one aggregate value by facet name and operation, decoded to
    /// the expected kind. A missing token decodes as the kind's zero value.
    pub fn get_value(&self, name: &str, operation: &str, kind: ValueKind) -> Result<Scalar> {
        match self.find_token(name, operation) {
            Some(token) => parse_value(&token, kind),
            None => Ok(kind.default_value()),
        }
    }

    fn find_token(&self, name: &str, operation: &str) -> Option<Value> {
        match self {
            AggregateRow::Term(row) => row
                .fields
                .iter()
                .find(|f| f.name == name && f.operation == operation)
                .map(|f| f.token.clone()),
            AggregateRow::Statistical(row) => {
                for (facet_name, result) in &row.facets {
                    match result {
                        AggregateResult::Stats(stats) if facet_name == name => {
                            if let Some(token) = stats.token(operation) {
                                return Some(token);
                            }
                        }
                        AggregateResult::SingleBucket(bucket)
                            if facet_name == name && operation == "doc_count" =>
                        {
                            return Some(Value::from(bucket.doc_count));
                        }
                        _ => {}
                    }
                }
                None
            }
        }
    }

    /// The grouping key, decoded to the expected kind. Composite keys
    /// decode as a JSON object keyed by component name.
    pub fn get_key(&self, kind: ValueKind) -> Result<Scalar> {
        match self {
            AggregateRow::Term(row) => match row.key.as_slice() {
                [(_, token)] => parse_value(token, kind),
                components => {
                    let object: serde_json::Map<String, Value> = components
                        .iter()
                        .map(|(name, token)| (name.clone(), token.clone()))
                        .collect();
                    Ok(Scalar::Json(Value::Object(object)))
                }
            },
            AggregateRow::Statistical(row) => match &row.key {
                Some(token) => parse_value(token, kind),
                None => Ok(kind.default_value()),
            },
        }
    }
}

/// A rebound projection element, evaluated against one row.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundExpr {
    /// The grouping key, decoded to the given kind.
    Key(ValueKind),
    /// An aggregate token lookup.
    Lookup {
        name: String,
        operation: String,
        kind: ValueKind,
    },
    /// A constant carried through from the projection.
    Literal(Scalar),
    Tuple(Vec<BoundExpr>),
}

/// Evaluates a rebound projection shape row by row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowProjector {
    pub shape: BoundExpr,
}

impl RowProjector {
    pub fn new(shape: BoundExpr) -> Self {
        Self { shape }
    }

    /// Produce one output row: one scalar per projection column.
    pub fn project(&self, row: &AggregateRow) -> Result<Vec<Scalar>> {
        match &self.shape {
            BoundExpr::Tuple(elements) => {
                elements.iter().map(|e| eval(e, row)).collect()
            }
            single => Ok(vec![eval(single, row)?]),
        }
    }
}

fn eval(expr: &BoundExpr, row: &AggregateRow) -> Result<Scalar> {
    match expr {
        BoundExpr::Key(kind) => row.get_key(*kind),
        BoundExpr::Lookup {
            name,
            operation,
            kind,
        } => row.get_value(name, operation, *kind),
        BoundExpr::Literal(value) => Ok(value.clone()),
        BoundExpr::Tuple(elements) => {
            let values: Vec<Value> = elements
                .iter()
                .map(|e| eval(e, row).map(|s| s.to_json()))
                .collect::<Result<_>>()?;
            Ok(Scalar::Json(Value::Array(values)))
        }
    }
}

/// Build a statistical row from top-level aggregation results.
pub fn statistical_row(
    key: Option<Value>,
    aggregations: impl IntoIterator<Item = (String, AggregateResult)>,
) -> AggregateRow {
    AggregateRow::Statistical(AggregateStatisticalRow {
        key,
        facets: aggregations.into_iter().collect(),
    })
}
