//! Remote ERP synchronization: HTTP client, response decoding, and sync
//! error classification.

pub mod errors;
mod erp_client;
mod response;

pub use erp_client::ErpClient;
pub use errors::{SyncError, SyncErrorCategory};
