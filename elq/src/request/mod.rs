//! Request-side model: criteria, facets, and the wire compiler

pub mod criteria;
pub mod facets;
pub mod formatter;
pub mod search;
