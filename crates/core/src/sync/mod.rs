//! Remote reconciliation: ports and the per-record push service.

pub mod ports;
pub mod reconcile;
