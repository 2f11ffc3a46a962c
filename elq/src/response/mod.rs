//! Response-side model: wire decoding, row shaping, and materialization

pub mod materializers;
pub mod row;
pub mod types;
