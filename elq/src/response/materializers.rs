//! Materializers: turning a decoded response into the terminal result shape
//!
//! Each compiled plan carries exactly one materializer. Hit-path plans read
//! the hits section; facet-path plans flatten the aggregation section into
//! [`AggregateRow`]s and project them. Materialization never mutates the
//! response, so running the same materializer twice over the same response
//! yields the same result.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::response::row::{
    statistical_row, AggregateField, AggregateRow, AggregateTermRow, CompositeKey, RowProjector,
};
use crate::response::types::{AggregateResult, Bucket, SearchResponse};

/// The result of materializing a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Materialized {
    Bool(bool),
    Long(i64),
    /// Zero or one source documents.
    Document(Option<Value>),
    /// Source documents in hit order.
    Documents(Vec<Value>),
    /// One projected aggregate row.
    Row(Vec<crate::value::Scalar>),
    /// Projected aggregate rows in flatten order.
    Rows(Vec<Vec<crate::value::Scalar>>),
}

/// Strategy for decoding one response shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Materializer {
    /// All hit sources, in order.
    List,
    /// Exactly one hit (or at most one, when `or_default`).
    One { single: bool, or_default: bool },
    /// Whether any hit matched, answered from the total.
    Any,
    /// The total hit count.
    Count,
    /// Aggregates over the whole matched set, no grouping buckets.
    TermlessFacet {
        projector: RowProjector,
        /// Grouped-by-constant plans return a one-row list; top-level
        /// aggregate terminals return the bare row.
        as_list: bool,
        /// The constant grouping key, when the plan grouped by one.
        key: Option<Value>,
    },
    /// Grouped aggregates: flatten the bucket tree and project each row.
    TermFacets { projector: RowProjector },
    /// Merges highlight fragments into each hit source, then delegates.
    Highlight(Box<Materializer>),
}

impl Materializer {
    pub fn materialize(&self, response: &SearchResponse) -> Result<Materialized> {
        match self {
            Materializer::List => Ok(Materialized::Documents(
                response.hits.hits.iter().map(|h| h.source.clone()).collect(),
            )),

            Materializer::One { single, or_default } => {
                let hits = &response.hits.hits;
                match hits.len() {
                    0 if *or_default => Ok(Materialized::Document(None)),
                    0 => Err(Error::EmptySequence),
                    1 => Ok(Materialized::Document(Some(hits[0].source.clone()))),
                    _ if *single => Err(Error::MultipleElements),
                    _ => Ok(Materialized::Document(Some(hits[0].source.clone()))),
                }
            }

            Materializer::Any => {
                let total = checked_total(response)?;
                Ok(Materialized::Bool(total > 0))
            }

            Materializer::Count => {
                let total = checked_total(response)?;
                Ok(Materialized::Long(total))
            }

            Materializer::TermlessFacet {
                projector,
                as_list,
                key,
            } => {
                let row = statistical_row(
                    key.clone(),
                    response
                        .aggregations
                        .iter()
                        .map(|(n, r)| (n.clone(), r.clone())),
                );
                let values = projector.project(&row)?;
                if *as_list {
                    Ok(Materialized::Rows(vec![values]))
                } else {
                    Ok(Materialized::Row(values))
                }
            }

            Materializer::TermFacets { projector } => {
                let rows = flatten_terms(response);
                let projected = rows
                    .iter()
                    .map(|row| projector.project(row))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Materialized::Rows(projected))
            }

            Materializer::Highlight(inner) => {
                let mut merged = response.clone();
                for hit in &mut merged.hits.hits {
                    let Some(highlight) = hit.highlight.take() else {
                        continue;
                    };
                    if let Value::Object(source) = &mut hit.source {
                        for (field, fragments) in highlight {
                            source.insert(
                                format!("{field}_highlight"),
                                Value::Array(fragments.into_iter().map(Value::String).collect()),
                            );
                        }
                    }
                }
                inner.materialize(&merged)
            }
        }
    }
}

fn checked_total(response: &SearchResponse) -> Result<i64> {
    let total = response.hits.total.value();
    if total < 0 {
        return Err(Error::InvalidResponse(format!(
            "negative hit total: {total}"
        )));
    }
    Ok(total)
}

/// Flatten the aggregation section into term rows.
///
/// A filter wrapper at the top level is unwrapped so the terms result it
/// encloses flattens under its own name. Filter buckets nested inside a
/// terms bucket contribute nothing here.
pub fn flatten_terms(response: &SearchResponse) -> Vec<AggregateRow> {
    let mut rows = Vec::new();
    for (name, result) in &response.aggregations {
        match result {
            AggregateResult::Buckets(b) => {
                flatten_level(name, &b.buckets, &Vec::new(), &mut rows);
            }
            AggregateResult::SingleBucket(wrapper) => {
                for (inner_name, inner) in &wrapper.aggregations {
                    if let AggregateResult::Buckets(b) = inner {
                        flatten_level(inner_name, &b.buckets, &Vec::new(), &mut rows);
                    }
                }
            }
            AggregateResult::Stats(_) => {}
        }
    }
    rows
}

fn flatten_level(
    name: &str,
    buckets: &[Bucket],
    base_key: &CompositeKey,
    rows: &mut Vec<AggregateRow>,
) {
    for bucket in buckets {
        let mut key = base_key.clone();
        key.push((name.to_string(), bucket_key_token(bucket)));

        let mut fields = Vec::new();
        let mut had_nested_buckets = false;
        for (sub_name, sub) in &bucket.aggregations {
            match sub {
                AggregateResult::Buckets(b) => {
                    had_nested_buckets = true;
                    flatten_level(sub_name, &b.buckets, &key, rows);
                }
                AggregateResult::Stats(stats) => {
                    for operation in ["sum", "avg", "max", "min"] {
                        if let Some(token) = stats.token(operation) {
                            fields.push(AggregateField::new(sub_name.clone(), operation, token));
                        }
                    }
                }
                // Filter buckets inside a terms bucket are not row sources
                AggregateResult::SingleBucket(_) => {}
            }
        }

        // Nested terms took over: this bucket only contributes its key
        if had_nested_buckets {
            continue;
        }
        // Sub-results were all filter buckets: nothing to make a row of
        if fields.is_empty() && !bucket.aggregations.is_empty() {
            continue;
        }
        fields.push(AggregateField::new(
            name,
            "doc_count",
            Value::from(bucket.doc_count),
        ));
        rows.push(AggregateRow::Term(AggregateTermRow { key, fields }));
    }
}

/// Wire token used as the bucket's key component. A non-blank
/// `key_as_string` wins over the raw key, which matters for date buckets
/// keyed by epoch milliseconds but formatted by the engine.
fn bucket_key_token(bucket: &Bucket) -> Value {
    match &bucket.key_as_string {
        Some(s) if !s.trim().is_empty() => Value::String(s.clone()),
        _ => bucket.key.clone(),
    }
}
