//! Query-plan compiler and response decoder for Elasticsearch
//!
//! An abstract [`Plan`] goes in one side; a [`SearchRequest`](request::search::SearchRequest)
//! plus the [`Materializer`](response::materializers::Materializer) that
//! decodes its response come out the other. Translation is a single pure
//! pass with no I/O; the transport lives in a separate crate.
//!
//! The main stages:
//!
//! - [`rebind::translate`] compiles a plan into criteria, facets, and a
//!   row projector
//! - [`request::formatter::compile`] renders the request as the engine's
//!   wire JSON
//! - [`response`] decodes the reply and materializes the terminal result,
//!   flattening nested aggregation buckets into typed rows

pub mod error;
pub mod mapping;
pub mod plan;
pub mod rebind;
pub mod request;
pub mod response;
pub mod value;

pub use error::{Error, Result};
pub use mapping::{DefaultMapping, FieldRef, Mapping};
pub use plan::{CompareOp, Expr, Plan, PlanStep, StatOp, Terminal};
pub use rebind::{translate, Translation};
pub use request::criteria::Criteria;
pub use request::formatter::{compile, WireSearchRequest};
pub use response::materializers::{Materialized, Materializer};
pub use response::types::SearchResponse;
pub use value::{Scalar, ValueKind};
