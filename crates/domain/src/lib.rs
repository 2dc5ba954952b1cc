//! # PunchBridge Domain
//!
//! Shared domain types for the attendance bridge: punch events, terminals,
//! sync statuses, remote payloads, configuration, and the application error
//! type. This crate has no I/O dependencies and is consumed by every other
//! crate in the workspace.

pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

pub use errors::{BridgeError, Result};
pub use types::config::{Config, DatabaseConfig, IngestConfig, SyncConfig};
pub use types::event::{
    InsertOutcome, NewPunchEvent, PunchDirection, PunchEvent, RawPunch, SyncStatus,
};
pub use types::remote::{
    CheckinPayload, PushOutcome, RemoteAuth, RemoteCredentials, RemoteEmployee, RemoteTerminal,
    SyncOutcome,
};
pub use types::terminal::{NewTerminal, Terminal};
pub use types::{CycleOptions, CycleSummary, DateRange, EventFilter, Page, Severity};
