//! Compiles a [`SearchRequest`] into the engine's wire query document
//!
//! A single deterministic top-down translation: criteria trees become the
//! engine's nested boolean queries, facet trees become (possibly nested)
//! aggregation requests. The match over [`Criteria`] is exhaustive, so an
//! unknown criteria kind is a compile-time failure rather than a silent
//! no-op.

use serde_json::{json, Map, Value};

use crate::request::criteria::{Criteria, RangeBound, RangeKind};
use crate::request::facets::{Facet, StatisticalFacet, TermsFacet, TermsStatsFacet};
use crate::request::search::{Highlight, SearchRequest};

/// Row cap applied when the caller did not request one.
const DEFAULT_SIZE: usize = 1000;

/// A compiled request, ready for JSON serialization and POST to the
/// engine's search endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct WireSearchRequest {
    pub index: String,
    pub document_type: String,
    pub search_type: Option<String>,
    pub body: Value,
}

impl WireSearchRequest {
    /// Path of the search endpoint for this request.
    pub fn url_path(&self) -> String {
        if self.document_type.is_empty() {
            format!("/{}/_search", self.index)
        } else {
            format!("/{}/{}/_search", self.index, self.document_type)
        }
    }
}

/// Compile a search request against an index into its wire document.
pub fn compile(index: &str, request: &SearchRequest) -> WireSearchRequest {
    let mut body = Map::new();

    if !request.fields.is_empty() {
        body.insert("_source".to_string(), json!(request.fields));
    }

    if let Some(min_score) = request.min_score {
        body.insert("min_score".to_string(), json!(min_score));
    }

    // A filter causes an enclosing bool query to be created
    match (&request.filter, &request.query) {
        (Some(filter), query) => {
            let mut bool_body = Map::new();
            bool_body.insert("filter".to_string(), json!([criteria_to_query(filter)]));
            if let Some(query) = query {
                bool_body.insert("must".to_string(), json!([criteria_to_query(query)]));
            }
            body.insert("query".to_string(), json!({ "bool": bool_body }));
        }
        (None, Some(query)) => {
            body.insert("query".to_string(), criteria_to_query(query));
        }
        (None, None) => {}
    }

    if !request.sort_options.is_empty() {
        let sort: Vec<Value> = request
            .sort_options
            .iter()
            .map(|s| {
                let mut clause = Map::new();
                clause.insert(
                    "order".to_string(),
                    json!(if s.ascending { "asc" } else { "desc" }),
                );
                if s.ignore_unmapped {
                    clause.insert("ignore_unmapped".to_string(), json!(true));
                }
                json!({ s.field.clone(): clause })
            })
            .collect();
        body.insert("sort".to_string(), json!(sort));
    }

    if let Some(from) = request.from {
        body.insert("from".to_string(), json!(from));
    }

    if request.aggregations.is_empty() {
        body.insert(
            "size".to_string(),
            json!(request.size.unwrap_or(DEFAULT_SIZE)),
        );
    } else {
        // Aggregation-only request: the row cap becomes the bucket size
        body.insert("size".to_string(), json!(0));
        let default_size = request.size.unwrap_or(DEFAULT_SIZE);
        let mut aggregations = Map::new();
        for facet in &request.aggregations {
            aggregations.insert(
                facet.name().to_string(),
                facet_to_aggregation(facet, default_size),
            );
        }
        body.insert("aggregations".to_string(), Value::Object(aggregations));
    }

    if let Some(highlight) = &request.highlight {
        body.insert("highlight".to_string(), highlight_to_body(highlight));
    }

    WireSearchRequest {
        index: index.to_string(),
        document_type: request.document_type.clone(),
        search_type: request.search_type.clone(),
        body: Value::Object(body),
    }
}

/// Compile one criteria node into its wire query.
pub fn criteria_to_query(criteria: &Criteria) -> Value {
    match criteria {
        Criteria::Term { field, value } => json!({ "term": { field.clone(): value.to_json() } }),

        Criteria::Terms { field, values } => {
            // One distinct value compiles as a term query
            if values.len() == 1 {
                json!({ "term": { field.clone(): values[0].to_json() } })
            } else {
                let values: Vec<Value> = values.iter().map(|v| v.to_json()).collect();
                json!({ "terms": { field.clone(): values } })
            }
        }

        Criteria::Range {
            field,
            kind,
            bounds,
        } => range_to_query(field, *kind, bounds),

        Criteria::Prefix { field, prefix } => json!({ "prefix": { field.clone(): prefix } }),

        Criteria::Regexp { field, pattern } => json!({ "regexp": { field.clone(): pattern } }),

        Criteria::Not(inner) => json!({ "bool": { "must_not": [criteria_to_query(inner)] } }),

        Criteria::QueryString { query, fields } => {
            let mut body = Map::new();
            body.insert("query".to_string(), json!(query));
            if !fields.is_empty() {
                body.insert("fields".to_string(), json!(fields));
            }
            json!({ "query_string": body })
        }

        Criteria::MatchAll => json!({ "match_all": {} }),

        Criteria::Bool {
            should,
            must,
            must_not,
        } => {
            let mut body = Map::new();
            if !should.is_empty() {
                body.insert("should".to_string(), queries(should));
            }
            if !must.is_empty() {
                body.insert("must".to_string(), queries(must));
            }
            if !must_not.is_empty() {
                body.insert("must_not".to_string(), queries(must_not));
            }
            json!({ "bool": body })
        }

        // A compound with one child collapses to that child
        Criteria::And(items) if items.len() == 1 => criteria_to_query(&items[0]),
        Criteria::Or(items) if items.len() == 1 => criteria_to_query(&items[0]),
        Criteria::And(items) => json!({ "bool": { "must": queries(items) } }),
        Criteria::Or(items) => json!({ "bool": { "should": queries(items) } }),
    }
}

fn queries(items: &[Criteria]) -> Value {
    Value::Array(items.iter().map(criteria_to_query).collect())
}

fn range_to_query(field: &str, kind: RangeKind, bounds: &[RangeBound]) -> Value {
    let mut body = Map::new();
    for bound in bounds {
        let value = match kind {
            // Numeric ranges compare the converted double of each bound
            RangeKind::Numeric => json!(bound.value.as_f64().unwrap_or(0.0)),
            // Temporal and geo values already render their wire strings;
            // text ranges compare bounds lexicographically
            RangeKind::Temporal | RangeKind::Geo => bound.value.to_json(),
            RangeKind::Text => match bound.value.to_json() {
                Value::String(s) => Value::String(s),
                other => Value::String(other.to_string()),
            },
        };
        body.insert(bound.comparison.key().to_string(), value);
    }

    match kind {
        RangeKind::Geo => json!({ "geo_distance_range": { field: body } }),
        _ => json!({ "range": { field: body } }),
    }
}

/// Compile one facet into its aggregation request body.
///
/// Terms facets build one nested terms level per field, each nested inside
/// the previous under a sub-aggregation keyed by the field name; only the
/// innermost level carries a size. A facet-level filter wraps the whole
/// result in a named filter aggregation.
fn facet_to_aggregation(facet: &Facet, default_size: usize) -> Value {
    let inner = match facet {
        Facet::Statistical(stats) => stats_aggregation(stats),
        Facet::Terms(terms) => terms_aggregation(terms, None, default_size),
        Facet::TermsStats(terms_stats) => terms_stats_aggregation(terms_stats, default_size),
        Facet::Filter(_) => Value::Null,
    };

    match facet.filter() {
        Some(filter) => {
            let mut body = Map::new();
            body.insert("filter".to_string(), criteria_to_query(filter));
            if !inner.is_null() {
                body.insert(
                    "aggregations".to_string(),
                    json!({ facet.name(): inner }),
                );
            }
            Value::Object(body)
        }
        None => inner,
    }
}

fn stats_aggregation(stats: &StatisticalFacet) -> Value {
    json!({ "stats": { "field": stats.field } })
}

fn terms_aggregation(terms: &TermsFacet, innermost_aggs: Option<Value>, default_size: usize) -> Value {
    let size = terms.size.unwrap_or(default_size);

    // Build innermost-out; outer levels carry no explicit size.
    // Construction guarantees at least one field.
    let Some((innermost_field, outer_fields)) = terms.fields.split_last() else {
        return Value::Null;
    };
    let mut node = Map::new();
    node.insert(
        "terms".to_string(),
        json!({ "field": innermost_field, "size": size }),
    );
    if let Some(aggs) = innermost_aggs {
        node.insert("aggregations".to_string(), aggs);
    }

    let mut nested_field = innermost_field.clone();
    for field in outer_fields.iter().rev() {
        let mut outer = Map::new();
        outer.insert("terms".to_string(), json!({ "field": field }));
        outer.insert(
            "aggregations".to_string(),
            json!({ nested_field: Value::Object(node) }),
        );
        node = outer;
        nested_field = field.clone();
    }

    Value::Object(node)
}

fn terms_stats_aggregation(terms_stats: &TermsStatsFacet, default_size: usize) -> Value {
    let mut stats = Map::new();
    for statistical in &terms_stats.statisticals {
        stats.insert(
            statistical.name.clone(),
            stats_aggregation(statistical),
        );
    }
    terms_aggregation(
        &terms_stats.terms,
        Some(Value::Object(stats)),
        default_size,
    )
}

fn highlight_to_body(highlight: &Highlight) -> Value {
    let mut fields = Map::new();
    for field in &highlight.fields {
        fields.insert(field.clone(), json!({}));
    }
    let mut body = Map::new();
    body.insert("fields".to_string(), Value::Object(fields));
    if let Some(pre) = &highlight.pre_tag {
        body.insert("pre_tags".to_string(), json!([pre]));
    }
    if let Some(post) = &highlight.post_tag {
        body.insert("post_tags".to_string(), json!([post]));
    }
    Value::Object(body)
}
