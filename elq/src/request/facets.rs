//! Facet model: the compiled aggregation-request tree

use crate::error::{Error, Result};
use crate::request::criteria::Criteria;

/// A node in the compiled aggregation-request tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Facet {
    Statistical(StatisticalFacet),
    Terms(TermsFacet),
    TermsStats(TermsStatsFacet),
    Filter(FilterFacet),
}

impl Facet {
    /// Name under which this facet appears in the aggregation request and
    /// its response. Caller-assigned or synthesized `"{operation}.{ordinal}"`.
    pub fn name(&self) -> &str {
        match self {
            Facet::Statistical(f) => &f.name,
            Facet::Terms(f) => &f.name,
            Facet::TermsStats(f) => &f.terms.name,
            Facet::Filter(f) => &f.name,
        }
    }

    /// Filter wrapped around the facet, if any.
    pub fn filter(&self) -> Option<&Criteria> {
        match self {
            Facet::Statistical(f) => f.filter.as_ref(),
            Facet::Terms(f) => f.filter.as_ref(),
            Facet::TermsStats(f) => f.terms.filter.as_ref(),
            Facet::Filter(f) => Some(&f.filter),
        }
    }
}

/// Statistical information (count, sum, min, max, mean) for one field over
/// the matched set.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticalFacet {
    pub name: String,
    pub field: String,
    pub filter: Option<Criteria>,
}

impl StatisticalFacet {
    pub fn new(name: impl Into<String>, field: impl Into<String>) -> Result<Self> {
        let name = not_blank("name", name.into())?;
        let field = not_blank("field", field.into())?;
        Ok(Self {
            name,
            field,
            filter: None,
        })
    }
}

/// Bucket counts per distinct term, over one or more grouping fields.
#[derive(Debug, Clone, PartialEq)]
pub struct TermsFacet {
    pub name: String,
    pub fields: Vec<String>,
    pub size: Option<usize>,
    pub filter: Option<Criteria>,
}

impl TermsFacet {
    pub fn new(name: impl Into<String>, fields: Vec<String>, size: Option<usize>) -> Result<Self> {
        let name = not_blank("name", name.into())?;
        if fields.is_empty() {
            return Err(Error::InvalidArgument("fields must not be empty".into()));
        }
        Ok(Self {
            name,
            fields,
            size,
            filter: None,
        })
    }

    pub fn with_filter(mut self, filter: Criteria) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// A terms facet carrying one statistical sub-facet per requested value
/// field, attached at the innermost grouping level.
#[derive(Debug, Clone, PartialEq)]
pub struct TermsStatsFacet {
    pub terms: TermsFacet,
    pub statisticals: Vec<StatisticalFacet>,
}

impl TermsStatsFacet {
    pub fn new(
        name: impl Into<String>,
        fields: Vec<String>,
        value_fields: Vec<String>,
        size: Option<usize>,
    ) -> Result<Self> {
        if value_fields.is_empty() {
            return Err(Error::InvalidArgument(
                "value_fields must not be empty".into(),
            ));
        }
        let statisticals = value_fields
            .into_iter()
            .map(|f| StatisticalFacet::new(f.clone(), f))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            terms: TermsFacet::new(name, fields, size)?,
            statisticals,
        })
    }
}

/// Predicate-only conditional count: a named filter whose bucket count is
/// the answer.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterFacet {
    pub name: String,
    pub filter: Criteria,
}

impl FilterFacet {
    pub fn new(name: impl Into<String>, filter: Criteria) -> Result<Self> {
        let name = not_blank("name", name.into())?;
        Ok(Self { name, filter })
    }
}

fn not_blank(name: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{name} must not be blank")));
    }
    Ok(value)
}
