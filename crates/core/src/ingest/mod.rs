//! Terminal ingestion: normalization and double-punch filtering.

pub mod filter;
pub mod normalize;
pub mod ports;
