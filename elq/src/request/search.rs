//! The aggregate search request document

use crate::request::criteria::Criteria;
use crate::request::facets::Facet;

/// A search request to be compiled into the engine's wire format.
///
/// When `aggregations` is non-empty the compiled document forces the hit
/// `size` to 0 and the requested row cap becomes the aggregation bucket
/// size instead; aggregation-only requests return no hits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    /// Index of the first document to return. Maps from a skip step.
    pub from: Option<usize>,
    /// Row cap. Maps from a take step.
    pub size: Option<usize>,
    pub document_type: String,
    /// Source fields to project instead of whole documents.
    pub fields: Vec<String>,
    pub sort_options: Vec<SortOption>,
    /// Filter-context criteria (unscored).
    pub filter: Option<Criteria>,
    /// Query-context criteria (scored).
    pub query: Option<Criteria>,
    pub aggregations: Vec<Facet>,
    pub search_type: Option<String>,
    pub min_score: Option<f64>,
    pub highlight: Option<Highlight>,
}

/// One sort clause.
#[derive(Debug, Clone, PartialEq)]
pub struct SortOption {
    pub field: String,
    pub ascending: bool,
    pub ignore_unmapped: bool,
}

impl SortOption {
    pub fn new(field: impl Into<String>, ascending: bool) -> Self {
        Self {
            field: field.into(),
            ascending,
            ignore_unmapped: false,
        }
    }
}

/// Highlighting configuration applied to matching hits.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub fields: Vec<String>,
    pub pre_tag: Option<String>,
    pub post_tag: Option<String>,
}
