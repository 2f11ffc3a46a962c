//! Rebinds grouped projections to facets and a row projection shape
//!
//! A grouped projection is visited once. Aggregate calls in the projection
//! become facet requests and row lookups in the same pass, so the names the
//! decoder looks up are the names the request was compiled with. Distinct
//! conditional counts get synthesized `"doc_count.{ordinal}"` names;
//! repeated stats over one field collapse into a single stats request.

use crate::error::{Error, Result};
use crate::mapping::Mapping;
use crate::plan::Expr;
use crate::rebind::criteria::rebind;
use crate::request::facets::{Facet, FilterFacet, StatisticalFacet, TermsFacet, TermsStatsFacet};
use crate::response::row::BoundExpr;
use crate::value::ValueKind;

/// Facet name used when counting without a member to hang the count on.
pub const GROUP_KEY_NAME: &str = "GroupKey";

/// Visits a grouped projection, accumulating the facets it needs.
pub struct FacetVisitor<'a> {
    mapping: &'a dyn Mapping,
    source: &'a str,
    group_by: Option<&'a Expr>,
    group_fields: Vec<String>,
    size: Option<usize>,
    aggregate_without_member: bool,
    stat_fields: Vec<String>,
    criteria: Vec<(String, crate::request::criteria::Criteria)>,
}

impl<'a> FacetVisitor<'a> {
    pub fn new(
        mapping: &'a dyn Mapping,
        source: &'a str,
        group_by: Option<&'a Expr>,
        size: Option<usize>,
    ) -> Result<Self> {
        let group_fields = match group_by {
            Some(Expr::Member(field)) => vec![mapping.field_name(source, field)],
            Some(Expr::Tuple(items)) => items
                .iter()
                .map(|item| match item {
                    Expr::Member(field) => Ok(mapping.field_name(source, field)),
                    other => Err(Error::UnsupportedAggregate(format!(
                        "composite grouping keys must be members: {other:?}"
                    ))),
                })
                .collect::<Result<Vec<_>>>()?,
            Some(Expr::Constant(_)) | None => Vec::new(),
            Some(other) => {
                return Err(Error::UnsupportedAggregate(format!(
                    "unsupported grouping key: {other:?}"
                )))
            }
        };

        Ok(Self {
            mapping,
            source,
            group_by,
            group_fields,
            size,
            aggregate_without_member: false,
            stat_fields: Vec::new(),
            criteria: Vec::new(),
        })
    }

    /// Visit the projection, returning the shape the row projector will
    /// evaluate per flattened row.
    pub fn visit(&mut self, projection: &Expr) -> Result<BoundExpr> {
        match projection {
            Expr::Count { predicate: None } => {
                self.aggregate_without_member = true;
                // The flattener records each leaf row's count under the
                // innermost grouping level, so the lookup binds to the last
                // group field, not the first
                let name = self
                    .group_fields
                    .last()
                    .cloned()
                    .unwrap_or_else(|| GROUP_KEY_NAME.to_string());
                Ok(BoundExpr::Lookup {
                    name,
                    operation: "doc_count".to_string(),
                    kind: ValueKind::Long,
                })
            }

            Expr::Count {
                predicate: Some(predicate),
            } => {
                if self.group_fields.len() > 1 {
                    return Err(Error::UnsupportedAggregate(
                        "conditional counts are not supported under composite grouping keys"
                            .to_string(),
                    ));
                }
                let criteria = rebind(self.mapping, self.source, predicate)?;
                let name = format!("doc_count.{}", self.criteria.len() + 1);
                self.criteria.push((name.clone(), criteria));
                Ok(BoundExpr::Lookup {
                    name,
                    operation: "doc_count".to_string(),
                    kind: ValueKind::Long,
                })
            }

            Expr::Stat { op, field } => {
                let name = self.mapping.field_name(self.source, field);
                if !self.stat_fields.contains(&name) {
                    self.stat_fields.push(name.clone());
                }
                Ok(BoundExpr::Lookup {
                    name,
                    operation: op.code().to_string(),
                    kind: field.kind,
                })
            }

            Expr::Key => {
                let kind = match self.group_by {
                    Some(Expr::Member(field)) => field.kind,
                    Some(Expr::Tuple(_)) => ValueKind::Json,
                    Some(Expr::Constant(value)) => value.kind(),
                    _ => {
                        return Err(Error::UnsupportedAggregate(
                            "key access without a grouping step".to_string(),
                        ))
                    }
                };
                Ok(BoundExpr::Key(kind))
            }

            Expr::Constant(value) => Ok(BoundExpr::Literal(value.clone())),

            Expr::Tuple(items) => Ok(BoundExpr::Tuple(
                items
                    .iter()
                    .map(|item| self.visit(item))
                    .collect::<Result<Vec<_>>>()?,
            )),

            other => Err(Error::UnsupportedAggregate(format!(
                "expression not usable in a grouped projection: {other:?}"
            ))),
        }
    }

    /// Whether the visited projection needs any facets at all.
    pub fn has_facets(&self) -> bool {
        self.aggregate_without_member || !self.stat_fields.is_empty() || !self.criteria.is_empty()
    }

    /// Compile the accumulated facet requests.
    pub fn into_facets(self) -> Result<Vec<Facet>> {
        let mut facets = Vec::new();

        if let Some(first) = self.group_fields.first() {
            if !self.stat_fields.is_empty() {
                facets.push(Facet::TermsStats(TermsStatsFacet::new(
                    first.clone(),
                    self.group_fields.clone(),
                    self.stat_fields,
                    self.size,
                )?));
            } else if self.aggregate_without_member || self.criteria.is_empty() {
                // Even a key-only projection needs the term buckets
                facets.push(Facet::Terms(TermsFacet::new(
                    first.clone(),
                    self.group_fields.clone(),
                    self.size,
                )?));
            }
            for (name, criteria) in self.criteria {
                facets.push(Facet::Terms(
                    TermsFacet::new(name, self.group_fields.clone(), self.size)?
                        .with_filter(criteria),
                ));
            }
        } else {
            if self.aggregate_without_member && self.group_by.is_some() {
                facets.push(Facet::Filter(FilterFacet::new(
                    GROUP_KEY_NAME,
                    crate::request::criteria::Criteria::MatchAll,
                )?));
            }
            for (name, criteria) in self.criteria {
                facets.push(Facet::Filter(FilterFacet::new(name, criteria)?));
            }
            for field in self.stat_fields {
                facets.push(Facet::Statistical(StatisticalFacet::new(
                    field.clone(),
                    field,
                )?));
            }
        }

        Ok(facets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{DefaultMapping, FieldRef};
    use crate::plan::StatOp;
    use crate::value::Scalar;

    fn field(name: &str, kind: ValueKind) -> FieldRef {
        FieldRef::new(name, kind)
    }

    fn visit(group_by: Option<&Expr>, projection: &Expr) -> Result<(BoundExpr, Vec<Facet>)> {
        let mut visitor = FacetVisitor::new(&DefaultMapping, "WebUser", group_by, None)?;
        let shape = visitor.visit(projection)?;
        Ok((shape, visitor.into_facets()?))
    }

    // ===================================================================
    // Grouped by member
    // ===================================================================

    #[test]
    fn test_key_and_count_builds_terms_facet() {
        let group = Expr::Member(field("Id", ValueKind::Long));
        let projection = Expr::Tuple(vec![Expr::Key, Expr::count()]);
        let (shape, facets) = visit(Some(&group), &projection).unwrap();

        assert_eq!(
            facets,
            vec![Facet::Terms(
                TermsFacet::new("id", vec!["id".to_string()], None).unwrap()
            )]
        );
        assert_eq!(
            shape,
            BoundExpr::Tuple(vec![
                BoundExpr::Key(ValueKind::Long),
                BoundExpr::Lookup {
                    name: "id".to_string(),
                    operation: "doc_count".to_string(),
                    kind: ValueKind::Long,
                },
            ])
        );
    }

    #[test]
    fn test_stat_builds_terms_stats_facet() {
        let group = Expr::Member(field("Joined", ValueKind::Date));
        let projection = Expr::Tuple(vec![
            Expr::Key,
            Expr::stat(StatOp::Max, field("Id", ValueKind::Long)),
        ]);
        let (shape, facets) = visit(Some(&group), &projection).unwrap();

        assert_eq!(
            facets,
            vec![Facet::TermsStats(
                TermsStatsFacet::new(
                    "joined",
                    vec!["joined".to_string()],
                    vec!["id".to_string()],
                    None
                )
                .unwrap()
            )]
        );
        assert_eq!(
            shape,
            BoundExpr::Tuple(vec![
                BoundExpr::Key(ValueKind::Date),
                BoundExpr::Lookup {
                    name: "id".to_string(),
                    operation: "max".to_string(),
                    kind: ValueKind::Long,
                },
            ])
        );
    }

    #[test]
    fn test_repeated_stats_over_one_field_share_a_request() {
        let group = Expr::Member(field("Joined", ValueKind::Date));
        let projection = Expr::Tuple(vec![
            Expr::stat(StatOp::Min, field("Id", ValueKind::Long)),
            Expr::stat(StatOp::Max, field("Id", ValueKind::Long)),
        ]);
        let (_, facets) = visit(Some(&group), &projection).unwrap();
        match &facets[0] {
            Facet::TermsStats(f) => assert_eq!(f.statisticals.len(), 1),
            other => panic!("Expected terms stats, got {other:?}"),
        }
    }

    #[test]
    fn test_conditional_counts_get_ordinal_names() {
        let group = Expr::Member(field("Id", ValueKind::Long));
        let projection = Expr::Tuple(vec![
            Expr::count_if(Expr::Member(field("Enabled", ValueKind::Bool))),
            Expr::count_if(Expr::not(Expr::Member(field("Enabled", ValueKind::Bool)))),
        ]);
        let (shape, facets) = visit(Some(&group), &projection).unwrap();

        assert_eq!(facets.len(), 2);
        assert_eq!(facets[0].name(), "doc_count.1");
        assert_eq!(facets[1].name(), "doc_count.2");
        assert!(facets[0].filter().is_some());
        match shape {
            BoundExpr::Tuple(items) => {
                assert_eq!(
                    items[0],
                    BoundExpr::Lookup {
                        name: "doc_count.1".to_string(),
                        operation: "doc_count".to_string(),
                        kind: ValueKind::Long,
                    }
                );
            }
            other => panic!("Expected tuple shape, got {other:?}"),
        }
    }

    #[test]
    fn test_bare_count_under_composite_key_binds_to_innermost_level() {
        let group = Expr::Tuple(vec![
            Expr::Member(field("Country", ValueKind::Text)),
            Expr::Member(field("City", ValueKind::Text)),
        ]);
        let (shape, _) = visit(Some(&group), &Expr::Tuple(vec![Expr::Key, Expr::count()]))
            .unwrap();
        match shape {
            BoundExpr::Tuple(items) => assert_eq!(
                items[1],
                BoundExpr::Lookup {
                    name: "city".to_string(),
                    operation: "doc_count".to_string(),
                    kind: ValueKind::Long,
                }
            ),
            other => panic!("Expected tuple shape, got {other:?}"),
        }
    }

    #[test]
    fn test_count_and_stat_share_one_terms_stats_facet() {
        let group = Expr::Member(field("Id", ValueKind::Long));
        let projection = Expr::Tuple(vec![
            Expr::Key,
            Expr::count(),
            Expr::stat(StatOp::Max, field("Balance", ValueKind::Double)),
        ]);
        let (shape, facets) = visit(Some(&group), &projection).unwrap();
        assert_eq!(facets.len(), 1);
        assert!(matches!(&facets[0], Facet::TermsStats(_)));
        // The count lookup still resolves: stats-bearing rows carry the
        // bucket's doc_count under the same level name
        match shape {
            BoundExpr::Tuple(items) => assert_eq!(
                items[1],
                BoundExpr::Lookup {
                    name: "id".to_string(),
                    operation: "doc_count".to_string(),
                    kind: ValueKind::Long,
                }
            ),
            other => panic!("Expected tuple shape, got {other:?}"),
        }
    }

    #[test]
    fn test_conditional_count_under_composite_key_is_unsupported() {
        let group = Expr::Tuple(vec![
            Expr::Member(field("Country", ValueKind::Text)),
            Expr::Member(field("City", ValueKind::Text)),
        ]);
        let projection = Expr::count_if(Expr::Member(field("Enabled", ValueKind::Bool)));
        let err = visit(Some(&group), &projection).unwrap_err();
        assert!(matches!(err, Error::UnsupportedAggregate(_)));
    }

    #[test]
    fn test_composite_key_decodes_as_json() {
        let group = Expr::Tuple(vec![
            Expr::Member(field("Country", ValueKind::Text)),
            Expr::Member(field("City", ValueKind::Text)),
        ]);
        let (shape, facets) = visit(Some(&group), &Expr::Tuple(vec![Expr::Key, Expr::count()]))
            .unwrap();
        match shape {
            BoundExpr::Tuple(items) => assert_eq!(items[0], BoundExpr::Key(ValueKind::Json)),
            other => panic!("Expected tuple shape, got {other:?}"),
        }
        match &facets[0] {
            Facet::Terms(f) => {
                assert_eq!(f.fields, vec!["country".to_string(), "city".to_string()]);
                assert_eq!(f.name, "country");
            }
            other => panic!("Expected terms facet, got {other:?}"),
        }
    }

    // ===================================================================
    // Grouped by constant
    // ===================================================================

    #[test]
    fn test_constant_group_count_builds_group_key_filter() {
        let group = Expr::Constant(Scalar::Long(1));
        let (shape, facets) = visit(Some(&group), &Expr::count()).unwrap();

        assert_eq!(
            facets,
            vec![Facet::Filter(
                FilterFacet::new(
                    GROUP_KEY_NAME,
                    crate::request::criteria::Criteria::MatchAll
                )
                .unwrap()
            )]
        );
        assert_eq!(
            shape,
            BoundExpr::Lookup {
                name: GROUP_KEY_NAME.to_string(),
                operation: "doc_count".to_string(),
                kind: ValueKind::Long,
            }
        );
    }

    #[test]
    fn test_constant_group_stats_build_statistical_facets() {
        let group = Expr::Constant(Scalar::Long(1));
        let projection = Expr::Tuple(vec![
            Expr::stat(StatOp::Sum, field("Id", ValueKind::Long)),
            Expr::stat(StatOp::Avg, field("Balance", ValueKind::Double)),
        ]);
        let (_, facets) = visit(Some(&group), &projection).unwrap();
        assert_eq!(facets.len(), 2);
        assert!(matches!(&facets[0], Facet::Statistical(f) if f.field == "id"));
        assert!(matches!(&facets[1], Facet::Statistical(f) if f.field == "balance"));
    }

    // ===================================================================
    // Rejected shapes
    // ===================================================================

    #[test]
    fn test_plain_member_in_projection_is_unsupported() {
        let group = Expr::Member(field("Id", ValueKind::Long));
        let err = visit(Some(&group), &Expr::Member(field("Name", ValueKind::Text))).unwrap_err();
        assert!(matches!(err, Error::UnsupportedAggregate(_)));
    }

    #[test]
    fn test_key_without_group_is_unsupported() {
        let err = visit(None, &Expr::Key).unwrap_err();
        assert!(matches!(err, Error::UnsupportedAggregate(_)));
    }
}
