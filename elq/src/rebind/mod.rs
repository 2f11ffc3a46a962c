//! Plan translation: one pass from an abstract plan to a request and
//! materializer pair
//!
//! Predicates rebind to criteria, grouped projections rebind to facets plus
//! a row projector, and the terminal picks the materializer. The two halves
//! are produced together so the names compiled into the request are the
//! names the decoder will look up.

pub mod criteria;
pub mod facets;

use tracing::debug;

use crate::error::{Error, Result};
use crate::mapping::Mapping;
use crate::plan::{Expr, Plan, PlanStep, Terminal};
use crate::rebind::criteria::rebind;
use crate::rebind::facets::FacetVisitor;
use crate::request::criteria::Criteria;
use crate::request::facets::{Facet, StatisticalFacet};
use crate::request::search::{SearchRequest, SortOption};
use crate::response::materializers::Materializer;
use crate::response::row::{BoundExpr, RowProjector};

/// The two halves of a compiled plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub request: SearchRequest,
    pub materializer: Materializer,
}

/// Compile a plan into a search request and the materializer that decodes
/// its response.
pub fn translate(mapping: &dyn Mapping, plan: &Plan) -> Result<Translation> {
    let source = plan.source.as_str();
    let mut request = SearchRequest {
        document_type: mapping.document_type(source),
        ..Default::default()
    };

    let mut filters = Vec::new();
    let mut queries = Vec::new();
    let mut group_by = None;
    let mut select = None;

    for step in &plan.steps {
        match step {
            PlanStep::Where(expr) => filters.push(rebind(mapping, source, expr)?),
            PlanStep::Query(expr) => queries.push(rebind(mapping, source, expr)?),
            PlanStep::GroupBy(expr) => group_by = Some(expr),
            PlanStep::Select(expr) => select = Some(expr),
            PlanStep::OrderBy {
                field,
                ascending,
                ignore_unmapped,
            } => request.sort_options.push(SortOption {
                field: mapping.field_name(source, field),
                ascending: *ascending,
                ignore_unmapped: *ignore_unmapped,
            }),
            PlanStep::Skip(n) => request.from = Some(*n),
            // Repeated takes keep the tightest cap
            PlanStep::Take(n) => request.size = Some(request.size.map_or(*n, |s| s.min(*n))),
            PlanStep::MinScore(score) => request.min_score = Some(*score),
            PlanStep::Highlight(highlight) => request.highlight = Some(highlight.clone()),
        }
    }

    if let Some(group) = group_by {
        let translation = translate_grouped(
            mapping, source, request, filters, queries, group, select,
        )?;
        return Ok(translation);
    }

    let materializer = match &plan.terminal {
        Terminal::List => Materializer::List,

        Terminal::First { or_default } => {
            request.size = Some(request.size.map_or(1, |s| s.min(1)));
            Materializer::One {
                single: false,
                or_default: *or_default,
            }
        }

        Terminal::Single { or_default } => {
            // Two hits are enough to prove non-uniqueness
            request.size = Some(request.size.map_or(2, |s| s.min(2)));
            Materializer::One {
                single: true,
                or_default: *or_default,
            }
        }

        Terminal::Any => {
            request.search_type = Some("count".to_string());
            Materializer::Any
        }

        Terminal::Count => {
            request.search_type = Some("count".to_string());
            Materializer::Count
        }

        Terminal::Aggregate(expr) => match expr {
            // A bare count is answered from the hit total, never a facet
            Expr::Count { predicate: None } => {
                request.search_type = Some("count".to_string());
                Materializer::Count
            }

            Expr::Count {
                predicate: Some(predicate),
            } => {
                filters.push(rebind(mapping, source, predicate)?);
                request.search_type = Some("count".to_string());
                Materializer::Count
            }

            Expr::Stat { op, field } => {
                let name = mapping.field_name(source, field);
                request.aggregations = vec![Facet::Statistical(StatisticalFacet::new(
                    name.clone(),
                    name.clone(),
                )?)];
                Materializer::TermlessFacet {
                    projector: RowProjector::new(BoundExpr::Lookup {
                        name,
                        operation: op.code().to_string(),
                        kind: field.kind,
                    }),
                    as_list: false,
                    key: None,
                }
            }

            other => {
                return Err(Error::UnsupportedAggregate(format!(
                    "unsupported terminal aggregate: {other:?}"
                )))
            }
        },
    };

    if request.aggregations.is_empty() {
        apply_projection(mapping, source, &mut request, select);
    }
    apply_criteria(&mut request, filters, queries)?;

    let materializer = match materializer {
        m @ (Materializer::List | Materializer::One { .. }) if request.highlight.is_some() => {
            Materializer::Highlight(Box::new(m))
        }
        m => m,
    };

    debug!(
        source,
        document_type = %request.document_type,
        "compiled hit-path plan"
    );
    Ok(Translation {
        request,
        materializer,
    })
}

fn translate_grouped(
    mapping: &dyn Mapping,
    source: &str,
    mut request: SearchRequest,
    filters: Vec<Criteria>,
    queries: Vec<Criteria>,
    group: &Expr,
    select: Option<&Expr>,
) -> Result<Translation> {
    let projection = select.ok_or_else(|| {
        Error::UnsupportedAggregate("grouping requires an aggregate projection".to_string())
    })?;

    let mut visitor = FacetVisitor::new(mapping, source, Some(group), request.size)?;
    let shape = visitor.visit(projection)?;
    request.aggregations = visitor.into_facets()?;

    let projector = RowProjector::new(shape);
    let materializer = match group {
        Expr::Constant(value) => Materializer::TermlessFacet {
            projector,
            as_list: true,
            key: Some(value.to_json()),
        },
        _ => Materializer::TermFacets { projector },
    };

    apply_criteria(&mut request, filters, queries)?;

    debug!(
        source,
        facets = request.aggregations.len(),
        "compiled facet-path plan"
    );
    Ok(Translation {
        request,
        materializer,
    })
}

fn apply_projection(
    mapping: &dyn Mapping,
    source: &str,
    request: &mut SearchRequest,
    select: Option<&Expr>,
) {
    // Only member projections narrow the source; anything else pulls
    // whole documents for the caller to shape
    match select {
        Some(Expr::Member(field)) => {
            request.fields = vec![mapping.field_name(source, field)];
        }
        Some(Expr::Tuple(items))
            if items.iter().all(|i| matches!(i, Expr::Member(_))) =>
        {
            request.fields = items
                .iter()
                .filter_map(|item| match item {
                    Expr::Member(field) => Some(mapping.field_name(source, field)),
                    _ => None,
                })
                .collect();
        }
        _ => {}
    }
}

fn apply_criteria(
    request: &mut SearchRequest,
    filters: Vec<Criteria>,
    queries: Vec<Criteria>,
) -> Result<()> {
    if !filters.is_empty() {
        request.filter = Some(Criteria::and(filters)?);
    }
    if !queries.is_empty() {
        request.query = Some(Criteria::and(queries)?);
    }
    Ok(())
}
