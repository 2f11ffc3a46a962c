//! Field-name and document-type mapping policy
//!
//! The compiler never inspects caller types itself. The plan front-end
//! hands it opaque [`FieldRef`] tokens and a [`Mapping`] implementation
//! turns those into engine field names and document type names.

use crate::value::ValueKind;

/// An opaque reference to a document member, as produced by the plan
/// front-end. Carries the member path and the declared value kind so the
/// compiler can pick range sub-kinds and decode lookups without runtime
/// type probing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub name: String,
    pub kind: ValueKind,
}

impl FieldRef {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Resolves document types and member references to engine names.
pub trait Mapping {
    /// Engine document type for a source type name.
    fn document_type(&self, source: &str) -> String;

    /// Engine field name for a member reference on a source type.
    fn field_name(&self, source: &str, member: &FieldRef) -> String;
}

/// Default mapping: lowercased document types and camelCased field names,
/// applied per path segment.
#[derive(Debug, Clone, Default)]
pub struct DefaultMapping;

impl Mapping for DefaultMapping {
    fn document_type(&self, source: &str) -> String {
        source.to_lowercase()
    }

    fn field_name(&self, _source: &str, member: &FieldRef) -> String {
        member
            .name
            .split('.')
            .map(camel_case)
            .collect::<Vec<_>>()
            .join(".")
    }
}

fn camel_case(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
