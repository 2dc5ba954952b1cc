//! # PunchBridge Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for the terminal transport, the local
//!   ledger, the remote system of record, and the excluded UI layer
//! - The punch normalizer and double-punch filter
//! - The reconcile, provisioning, and sync-orchestration services
//!
//! ## Architecture Principles
//! - Only depends on `punchbridge-domain`
//! - No database, HTTP, or socket code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod ingest;
pub mod ledger_ports;
pub mod orchestrator;
pub mod provisioning;
pub mod sync;

pub use ingest::filter::{DoublePunchFilter, LastSeen, PunchDecision};
pub use ingest::normalize::{normalize_batch, NormalizedPunch};
pub use ingest::ports::TerminalTransport;
pub use ledger_ports::{EventLedger, TerminalRegistry};
pub use orchestrator::SyncService;
pub use provisioning::ProvisioningService;
pub use sync::ports::{
    CredentialProvider, EmployeeDirectory, NotificationSink, RemoteCheckins,
    RemoteTerminalDirectory,
};
pub use sync::reconcile::{ReconcileService, ReconcileStats};
