//! Error types for query compilation and response decoding

/// Errors raised while compiling a query plan or decoding an engine response.
///
/// All failures are synchronous and surface at the point of compile or
/// decode; nothing is retried here. Retry policy belongs to the transport
/// layer and never changes the outcome of translation or decoding.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed input to a constructor (blank field name, empty values).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A predicate shape outside the recognized criteria vocabulary.
    #[error("unsupported criteria: {0}")]
    UnsupportedCriteria(String),

    /// An aggregate call shape outside the recognized vocabulary.
    #[error("unsupported aggregate: {0}")]
    UnsupportedAggregate(String),

    /// The engine returned a structurally impossible response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A single-result materializer found no hits.
    #[error("sequence contains no elements")]
    EmptySequence,

    /// A single-result materializer found more than one hit.
    #[error("sequence contains more than one element")]
    MultipleElements,
}

/// Result type for compile and decode operations.
pub type Result<T> = std::result::Result<T, Error>;
