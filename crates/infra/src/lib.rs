//! # PunchBridge Infrastructure
//!
//! Infrastructure implementations of the core domain ports.
//!
//! This crate contains:
//! - SQLite implementations of the event ledger and terminal registry
//! - The terminal wire protocol and its TCP/UDP transport
//! - The ERP HTTP client (employee directory, checkins, device directory)
//! - The interval scheduler that drives periodic sync cycles
//! - Configuration loading from environment variables or files
//!
//! ## Architecture
//! - Implements traits defined in `punchbridge-core`
//! - Contains all "impure" code (sockets, HTTP, filesystem)

pub mod config;
pub mod credentials;
pub mod database;
pub mod errors;
pub mod notify;
pub mod scheduling;
pub mod sync;
pub mod terminal;

pub use credentials::StaticCredentialProvider;
pub use database::{DbManager, SqliteEventLedger, SqliteTerminalRegistry};
pub use errors::InfraError;
pub use notify::TracingNotificationSink;
pub use scheduling::{CycleScheduler, CycleSchedulerConfig};
pub use sync::ErpClient;
pub use terminal::ZkTerminalClient;
