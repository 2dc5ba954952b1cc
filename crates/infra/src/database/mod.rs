//! SQLite persistence: the punch event ledger and the terminal registry.

mod event_repository;
mod manager;
mod terminal_repository;

pub use event_repository::SqliteEventLedger;
pub use manager::DbManager;
pub use terminal_repository::SqliteTerminalRegistry;
