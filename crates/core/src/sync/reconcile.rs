//! Per-record push of pending ledger events to the remote system.
//!
//! One pass drains up to a batch of pending events oldest-first. Every
//! record gets its own classification; a failure on one record never stops
//! the rest of the batch. Transient failures (network, 5xx) leave the record
//! pending so the next cycle retries it, while definitive rejections move it
//! to a terminal status exactly once.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use punchbridge_domain::constants::{RECONCILE_BATCH_LIMIT, REMOTE_TIMESTAMP_FORMAT};
use punchbridge_domain::{
    CheckinPayload, PunchEvent, PushOutcome, Result, SyncOutcome, SyncStatus,
};

use crate::ledger_ports::{EventLedger, TerminalRegistry};
use crate::sync::ports::{EmployeeDirectory, RemoteCheckins};

/// Counts for one reconcile pass, folded into the cycle summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Records the remote system accepted.
    pub synced: usize,
    /// Records the remote system already had.
    pub duplicates: usize,
    /// Records with no resolvable identity (terminal status).
    pub errors: usize,
    /// Records left pending after a transient failure.
    pub deferred: usize,
}

/// Pushes pending ledger events to the remote system of record.
pub struct ReconcileService {
    ledger: Arc<dyn EventLedger>,
    registry: Arc<dyn TerminalRegistry>,
    directory: Arc<dyn EmployeeDirectory>,
    checkins: Arc<dyn RemoteCheckins>,
}

impl ReconcileService {
    pub fn new(
        ledger: Arc<dyn EventLedger>,
        registry: Arc<dyn TerminalRegistry>,
        directory: Arc<dyn EmployeeDirectory>,
        checkins: Arc<dyn RemoteCheckins>,
    ) -> Self {
        Self { ledger, registry, directory, checkins }
    }

    /// Run one reconcile pass over the pending backlog for `scope`.
    ///
    /// The employee directory is refetched every pass: badge-to-identity
    /// assignments change on the remote side and a stale map would attribute
    /// punches to the wrong person.
    #[instrument(skip(self), fields(scope = scope.unwrap_or("*")))]
    pub async fn run_pass(&self, scope: Option<&str>) -> Result<ReconcileStats> {
        let pending = self.ledger.unsynced(RECONCILE_BATCH_LIMIT, scope).await?;
        if pending.is_empty() {
            return Ok(ReconcileStats::default());
        }

        let identities = self.identity_map().await?;
        let device_ids = self.device_id_map(scope).await?;

        let mut stats = ReconcileStats::default();
        let mut synced_ids = Vec::new();
        let mut duplicate_ids = Vec::new();
        let mut error_ids = Vec::new();

        for event in &pending {
            match self.push_one(event, &identities, &device_ids).await {
                SyncOutcome::Accepted => {
                    stats.synced += 1;
                    synced_ids.push(event.id);
                }
                SyncOutcome::AlreadyExists => {
                    stats.duplicates += 1;
                    duplicate_ids.push(event.id);
                }
                SyncOutcome::IdentityUnresolved => {
                    stats.errors += 1;
                    error_ids.push(event.id);
                }
                SyncOutcome::TransientFailure => {
                    stats.deferred += 1;
                }
            }
        }

        if !synced_ids.is_empty() {
            self.ledger.mark_status(&synced_ids, SyncStatus::Synced).await?;
        }
        if !duplicate_ids.is_empty() {
            self.ledger.mark_status(&duplicate_ids, SyncStatus::Duplicate).await?;
        }
        if !error_ids.is_empty() {
            self.ledger.mark_status(&error_ids, SyncStatus::Error).await?;
        }

        debug!(
            synced = stats.synced,
            duplicates = stats.duplicates,
            errors = stats.errors,
            deferred = stats.deferred,
            "reconcile pass finished"
        );
        Ok(stats)
    }

    /// Classify one record. Never returns an error: transient failures are
    /// an outcome, not a reason to abort the batch.
    async fn push_one(
        &self,
        event: &PunchEvent,
        identities: &HashMap<String, String>,
        device_ids: &HashMap<i64, String>,
    ) -> SyncOutcome {
        let Some(employee) = identities.get(&event.subject_id) else {
            warn!(
                event_id = event.id,
                subject = %event.subject_id,
                "no remote identity for subject"
            );
            return SyncOutcome::IdentityUnresolved;
        };

        let local_time = event.timestamp.format(REMOTE_TIMESTAMP_FORMAT).to_string();

        // Pre-check before creating: cheaper than a rejection round-trip and
        // independent of remote-side error message wording.
        match self.checkins.checkin_exists(employee, &local_time).await {
            Ok(true) => return SyncOutcome::AlreadyExists,
            Ok(false) => {}
            Err(err) => {
                warn!(event_id = event.id, error = %err, "duplicate pre-check failed");
                return SyncOutcome::TransientFailure;
            }
        }

        let device_id = device_ids
            .get(&event.terminal_id)
            .cloned()
            .unwrap_or_else(|| event.terminal_id.to_string());
        let payload = CheckinPayload {
            employee: employee.clone(),
            time: local_time,
            log_type: event.direction,
            device_id,
        };

        match self.checkins.create_checkin(&payload).await {
            Ok(PushOutcome::Created) => SyncOutcome::Accepted,
            Ok(PushOutcome::Duplicate) => SyncOutcome::AlreadyExists,
            Ok(PushOutcome::UnknownEmployee) => {
                warn!(
                    event_id = event.id,
                    employee = %payload.employee,
                    "remote rejected unknown employee"
                );
                SyncOutcome::IdentityUnresolved
            }
            Err(err) => {
                warn!(event_id = event.id, error = %err, "checkin push failed");
                SyncOutcome::TransientFailure
            }
        }
    }

    /// Badge id -> canonical remote identity. Subjects without a configured
    /// badge id are absent from the map and resolve to nothing.
    async fn identity_map(&self) -> Result<HashMap<String, String>> {
        let employees = self.directory.fetch_directory().await?;
        Ok(employees
            .into_iter()
            .filter_map(|e| e.attendance_device_id.map(|badge| (badge, e.name)))
            .collect())
    }

    /// Local terminal id -> remote device id.
    async fn device_id_map(&self, scope: Option<&str>) -> Result<HashMap<i64, String>> {
        let terminals = self.registry.list(scope).await?;
        Ok(terminals.iter().map(|t| (t.id, t.remote_id())).collect())
    }
}
