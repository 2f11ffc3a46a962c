//! Wire response document, decoded with serde
//!
//! Aggregation maps are ordered (`BTreeMap`) so decoding the same response
//! twice always walks buckets in the same order.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use serde_json::Value;

/// Top-level search response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub hits: Hits,
    #[serde(default)]
    pub aggregations: BTreeMap<String, AggregateResult>,
}

/// The hit section of a response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Hits {
    #[serde(default)]
    pub total: TotalHits,
    pub max_score: Option<f64>,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

/// Total hit count. Older engines report a bare number, newer ones an
/// object with a relation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TotalHits {
    Count(i64),
    Object {
        value: i64,
        #[serde(default)]
        relation: String,
    },
}

impl TotalHits {
    pub fn value(&self) -> i64 {
        match self {
            TotalHits::Count(n) => *n,
            TotalHits::Object { value, .. } => *value,
        }
    }
}

impl Default for TotalHits {
    fn default() -> Self {
        TotalHits::Count(0)
    }
}

/// One matched document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Hit {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_score")]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: Value,
    pub highlight: Option<HashMap<String, Vec<String>>>,
}

/// One named aggregation result.
///
/// The engine does not tag result shapes, so decoding tries the variants in
/// order: a bucketed result, then a stats result, then a single filter
/// bucket. `count` is required on stats so a filter bucket (which has only
/// `doc_count`) never mis-decodes as stats.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AggregateResult {
    Buckets(BucketsResult),
    Stats(StatsResult),
    SingleBucket(SingleBucketResult),
}

/// A terms-style result holding one bucket per distinct key.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BucketsResult {
    #[serde(default)]
    pub doc_count_error_upper_bound: i64,
    #[serde(default)]
    pub sum_other_doc_count: i64,
    pub buckets: Vec<Bucket>,
}

/// A stats result. Min/max/sum/avg stay raw JSON because empty sets
/// produce null or `"Infinity"` tokens that only the row layer can type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatsResult {
    pub count: i64,
    #[serde(default)]
    pub min: Value,
    #[serde(default)]
    pub max: Value,
    #[serde(default)]
    pub sum: Value,
    #[serde(default)]
    pub avg: Value,
}

impl StatsResult {
    /// Token for one statistical operation code.
    pub fn token(&self, operation: &str) -> Option<Value> {
        match operation {
            "count" => Some(Value::from(self.count)),
            "min" => Some(self.min.clone()),
            "max" => Some(self.max.clone()),
            "sum" => Some(self.sum.clone()),
            "avg" => Some(self.avg.clone()),
            _ => None,
        }
    }
}

/// A filter-aggregation result: one unnamed bucket with a count and
/// optional nested results.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SingleBucketResult {
    pub doc_count: i64,
    #[serde(flatten)]
    pub aggregations: BTreeMap<String, AggregateResult>,
}

/// One bucket of a terms-style result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Bucket {
    pub key: Value,
    pub key_as_string: Option<String>,
    #[serde(default)]
    pub doc_count: i64,
    #[serde(flatten)]
    pub aggregations: BTreeMap<String, AggregateResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(body: Value) -> SearchResponse {
        serde_json::from_value(body).unwrap()
    }

    // ===================================================================
    // Hit decoding
    // ===================================================================

    #[test]
    fn test_decode_hits() {
        let response = decode(json!({
            "took": 3,
            "timed_out": false,
            "hits": {
                "total": 2,
                "max_score": 1.0,
                "hits": [
                    {"_index": "users", "_id": "1", "_score": 1.0, "_source": {"id": 1}},
                    {"_index": "users", "_id": "2", "_score": 0.5, "_source": {"id": 2}}
                ]
            }
        }));
        assert_eq!(response.hits.total.value(), 2);
        assert_eq!(response.hits.hits.len(), 2);
        assert_eq!(response.hits.hits[0].source, json!({"id": 1}));
    }

    #[test]
    fn test_decode_object_total() {
        let response = decode(json!({
            "hits": {"total": {"value": 10, "relation": "gte"}, "hits": []}
        }));
        assert_eq!(response.hits.total.value(), 10);
    }

    #[test]
    fn test_decode_highlight() {
        let response = decode(json!({
            "hits": {"total": 1, "hits": [
                {"_id": "1", "_source": {}, "highlight": {"name": ["<em>bob</em>"]}}
            ]}
        }));
        let highlight = response.hits.hits[0].highlight.as_ref().unwrap();
        assert_eq!(highlight["name"], vec!["<em>bob</em>"]);
    }

    // ===================================================================
    // Aggregation decoding
    // ===================================================================

    #[test]
    fn test_decode_buckets() {
        let response = decode(json!({
            "aggregations": {
                "id": {
                    "doc_count_error_upper_bound": 0,
                    "sum_other_doc_count": 0,
                    "buckets": [
                        {"key": 1, "doc_count": 3},
                        {"key": 2, "doc_count": 5}
                    ]
                }
            }
        }));
        match &response.aggregations["id"] {
            AggregateResult::Buckets(b) => {
                assert_eq!(b.buckets.len(), 2);
                assert_eq!(b.buckets[0].key, json!(1));
                assert_eq!(b.buckets[1].doc_count, 5);
            }
            other => panic!("Expected buckets, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_stats() {
        let response = decode(json!({
            "aggregations": {
                "id": {"count": 4, "min": 1.0, "max": 9.0, "sum": 20.0, "avg": 5.0}
            }
        }));
        match &response.aggregations["id"] {
            AggregateResult::Stats(s) => {
                assert_eq!(s.count, 4);
                assert_eq!(s.token("avg"), Some(json!(5.0)));
            }
            other => panic!("Expected stats, got {other:?}"),
        }
    }

    #[test]
    fn test_stats_with_null_bounds() {
        let response = decode(json!({
            "aggregations": {"id": {"count": 0, "min": null, "max": null, "sum": 0.0, "avg": null}}
        }));
        match &response.aggregations["id"] {
            AggregateResult::Stats(s) => assert!(s.min.is_null()),
            other => panic!("Expected stats, got {other:?}"),
        }
    }

    #[test]
    fn test_filter_bucket_does_not_decode_as_stats() {
        let response = decode(json!({
            "aggregations": {"doc_count.1": {"doc_count": 7}}
        }));
        match &response.aggregations["doc_count.1"] {
            AggregateResult::SingleBucket(b) => assert_eq!(b.doc_count, 7),
            other => panic!("Expected single bucket, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_nested_bucket_aggregations() {
        let response = decode(json!({
            "aggregations": {
                "joined": {
                    "buckets": [
                        {
                            "key": 1000,
                            "doc_count": 2,
                            "id": {"count": 2, "min": 3.0, "max": 7.0, "sum": 10.0, "avg": 5.0}
                        }
                    ]
                }
            }
        }));
        match &response.aggregations["joined"] {
            AggregateResult::Buckets(b) => {
                assert!(matches!(
                    b.buckets[0].aggregations["id"],
                    AggregateResult::Stats(_)
                ));
            }
            other => panic!("Expected buckets, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_single_bucket_with_nested() {
        let response = decode(json!({
            "aggregations": {
                "GroupKey": {
                    "doc_count": 10,
                    "id": {"count": 10, "min": 1, "max": 99, "sum": 500, "avg": 50}
                }
            }
        }));
        match &response.aggregations["GroupKey"] {
            AggregateResult::SingleBucket(b) => {
                assert_eq!(b.doc_count, 10);
                assert!(b.aggregations.contains_key("id"));
            }
            other => panic!("Expected single bucket, got {other:?}"),
        }
    }

    #[test]
    fn test_bucket_key_as_string() {
        let response = decode(json!({
            "aggregations": {
                "joined": {"buckets": [
                    {"key": 1704153600000i64, "key_as_string": "2024-01-02", "doc_count": 1}
                ]}
            }
        }));
        match &response.aggregations["joined"] {
            AggregateResult::Buckets(b) => {
                assert_eq!(b.buckets[0].key_as_string.as_deref(), Some("2024-01-02"));
            }
            other => panic!("Expected buckets, got {other:?}"),
        }
    }
}
