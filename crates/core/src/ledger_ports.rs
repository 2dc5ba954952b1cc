//! Port interfaces for the local ledger and terminal registry.
//!
//! Every read/write is scopeable by the owning remote instance (`scope` is
//! the remote base URL) because the local cache may serve several remote
//! deployments over its lifetime and must never mix their data. A `None`
//! scope matches all rows and exists for maintenance tooling only.

use async_trait::async_trait;
use chrono::NaiveDate;
use punchbridge_domain::{
    EventFilter, InsertOutcome, NewPunchEvent, NewTerminal, Page, PunchEvent, Result, SyncStatus,
    Terminal,
};

/// Durable, deduplicating store of punch events with a status lifecycle.
#[async_trait]
pub trait EventLedger: Send + Sync {
    /// Insert one event. `inserted == false` reports that the uniqueness
    /// constraint on (terminal, subject, timestamp) rejected a duplicate;
    /// this is expected and must not be treated as an error.
    async fn insert(&self, event: &NewPunchEvent) -> Result<InsertOutcome>;

    /// Most recent prior event for a subject within a scope. Used to seed
    /// the double-punch filter across cycles.
    async fn last_event_for(
        &self,
        scope: Option<&str>,
        subject_id: &str,
    ) -> Result<Option<PunchEvent>>;

    /// Pending events oldest-first. Pushing oldest-first preserves a
    /// meaningful audit trail on the remote side.
    async fn unsynced(&self, limit: usize, scope: Option<&str>) -> Result<Vec<PunchEvent>>;

    /// Bulk status transition out of `Pending`. Rejects `Pending` as the
    /// target; resets go through [`EventLedger::reset_status`].
    async fn mark_status(&self, ids: &[i64], status: SyncStatus) -> Result<()>;

    /// Reset `{synced, duplicate, error}` rows back to pending for a forced
    /// resync. Suppressed rows are never reset.
    async fn reset_status(&self, ids: &[i64]) -> Result<usize>;

    /// Date-range variant of [`EventLedger::reset_status`], bounds inclusive
    /// on the local calendar date.
    async fn reset_status_by_date(
        &self,
        scope: Option<&str>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<usize>;

    /// Hard-delete events older than the cutoff, scoped to one remote
    /// instance. Returns the number of deleted rows.
    async fn retention_cleanup(&self, older_than_days: u32, scope: Option<&str>) -> Result<usize>;

    /// Paged event listing for the UI layer, newest first.
    async fn list_events(
        &self,
        scope: Option<&str>,
        filter: &EventFilter,
        page: &Page,
    ) -> Result<Vec<PunchEvent>>;
}

/// Local cache of configured terminals.
#[async_trait]
pub trait TerminalRegistry: Send + Sync {
    /// Terminals for one scope.
    async fn list(&self, scope: Option<&str>) -> Result<Vec<Terminal>>;

    /// Terminal by local id.
    async fn get(&self, id: i64) -> Result<Option<Terminal>>;

    /// Create or update by (host, port). Optional fields merge: a `None`
    /// never overwrites a stored value. Returns the local id.
    async fn upsert(&self, terminal: &NewTerminal) -> Result<i64>;

    /// Hard delete, cascading to the terminal's punch events. Irreversible.
    async fn remove(&self, id: i64) -> Result<()>;
}
