//! Sync cycle orchestration: fetch from every terminal, ingest through the
//! double-punch filter, then reconcile the pending backlog.
//!
//! Cycles are single-flight. A trigger that arrives while a cycle is running
//! waits and runs immediately afterwards, and at most one such trigger is
//! queued; further triggers are rejected with `Busy`. Manual triggers and
//! the scheduler share this gate, so they can never interleave ingests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use punchbridge_domain::constants::TERMINAL_PROBE_TIMEOUT;
use punchbridge_domain::{
    BridgeError, CycleOptions, CycleSummary, EventFilter, NewPunchEvent, Page, PunchEvent, Result,
    Severity, SyncStatus, Terminal,
};

use crate::ingest::filter::{DoublePunchFilter, LastSeen};
use crate::ingest::normalize::normalize_batch;
use crate::ingest::ports::TerminalTransport;
use crate::ledger_ports::{EventLedger, TerminalRegistry};
use crate::sync::ports::{CredentialProvider, NotificationSink};
use crate::sync::reconcile::ReconcileService;

/// How many terminals are fetched concurrently. Ingest itself stays
/// sequential so one alternation map serves the whole cycle.
const FETCH_CONCURRENCY: usize = 4;

/// Drives full fetch-and-reconcile cycles across all configured terminals.
pub struct SyncService {
    registry: Arc<dyn TerminalRegistry>,
    transport: Arc<dyn TerminalTransport>,
    ledger: Arc<dyn EventLedger>,
    reconciler: Arc<ReconcileService>,
    credentials: Arc<dyn CredentialProvider>,
    notifier: Arc<dyn NotificationSink>,
    in_flight: Mutex<()>,
    queued: AtomicBool,
}

impl SyncService {
    pub fn new(
        registry: Arc<dyn TerminalRegistry>,
        transport: Arc<dyn TerminalTransport>,
        ledger: Arc<dyn EventLedger>,
        reconciler: Arc<ReconcileService>,
        credentials: Arc<dyn CredentialProvider>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            registry,
            transport,
            ledger,
            reconciler,
            credentials,
            notifier,
            in_flight: Mutex::new(()),
            queued: AtomicBool::new(false),
        }
    }

    /// Run one full cycle. Terminal fetch failures are reported inside the
    /// summary; only configuration problems (no credentials, no terminals)
    /// and an over-full trigger queue surface as errors.
    #[instrument(skip_all)]
    pub async fn run_cycle(&self, options: &CycleOptions) -> Result<CycleSummary> {
        let _guard = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                if self.queued.swap(true, Ordering::SeqCst) {
                    return Err(BridgeError::Busy(
                        "a sync cycle is running and another is already queued".to_string(),
                    ));
                }
                debug!("cycle in flight, trigger queued");
                let guard = self.in_flight.lock().await;
                self.queued.store(false, Ordering::SeqCst);
                guard
            }
        };

        let Some(credentials) = self.credentials.current().await? else {
            return Err(BridgeError::Config("not connected to a remote instance".to_string()));
        };
        let scope = credentials.scope();

        let terminals = self.registry.list(Some(&scope)).await?;
        if terminals.is_empty() {
            return Err(BridgeError::Config("no terminals configured".to_string()));
        }

        let mut summary = CycleSummary::default();
        let mut filter = DoublePunchFilter::new(options.double_punch_threshold_secs);

        // Fetch every terminal concurrently, then ingest the batches one at
        // a time: the alternation map must see events in order.
        let range = options.date_range;
        let mut fetch_tasks = Vec::with_capacity(terminals.len());
        for terminal in &terminals {
            let transport = Arc::clone(&self.transport);
            fetch_tasks.push(async move {
                let result = transport.fetch_records(terminal, range.as_ref()).await;
                (terminal, result)
            });
        }
        let fetches: Vec<_> = stream::iter(fetch_tasks)
            .buffer_unordered(FETCH_CONCURRENCY)
            .collect()
            .await;

        for (terminal, result) in fetches {
            match result {
                Ok(raw) => {
                    self.ingest_batch(terminal, raw, &scope, &mut filter, &mut summary)
                        .await?;
                }
                Err(err) => {
                    warn!(terminal = %terminal.name, error = %err, "terminal fetch failed");
                    summary
                        .terminal_errors
                        .push(format!("{}: {err}", terminal.name));
                }
            }
        }

        match self.reconciler.run_pass(Some(&scope)).await {
            Ok(stats) => {
                summary.synced = stats.synced;
                summary.duplicates = stats.duplicates;
                summary.errors = stats.errors;
                summary.deferred = stats.deferred;
            }
            Err(err) => {
                warn!(error = %err, "reconcile pass failed");
                summary.terminal_errors.push(format!("reconcile: {err}"));
            }
        }

        self.report(&summary);
        Ok(summary)
    }

    /// Ingest one terminal's raw batch through the filter into the ledger.
    async fn ingest_batch(
        &self,
        terminal: &Terminal,
        raw: Vec<punchbridge_domain::RawPunch>,
        scope: &str,
        filter: &mut DoublePunchFilter,
        summary: &mut CycleSummary,
    ) -> Result<()> {
        let batch = normalize_batch(raw);
        debug!(terminal = %terminal.name, records = batch.len(), "ingesting batch");

        for punch in batch {
            if !filter.contains(&punch.subject_id) {
                if let Some(prev) = self
                    .ledger
                    .last_event_for(Some(scope), &punch.subject_id)
                    .await?
                {
                    filter.seed(
                        &punch.subject_id,
                        LastSeen { timestamp: prev.timestamp, direction: prev.direction },
                    );
                }
            }

            // A subject with no history anywhere gets the filter's IN
            // default; the vendor's own direction code is never stored.
            let decision = filter.classify(&punch.subject_id, punch.timestamp);

            let status = if decision.suppressed { SyncStatus::Suppressed } else { SyncStatus::Pending };
            let outcome = self
                .ledger
                .insert(&NewPunchEvent {
                    terminal_id: terminal.id,
                    subject_id: punch.subject_id.clone(),
                    timestamp: punch.timestamp,
                    direction: decision.direction,
                    status,
                })
                .await?;

            // Replays of already-stored events must not advance the
            // alternation state or the counters.
            if !outcome.inserted {
                continue;
            }
            if decision.suppressed {
                summary.suppressed += 1;
            } else {
                summary.imported += 1;
                filter.observe(&punch.subject_id, punch.timestamp, decision.direction);
            }
        }

        Ok(())
    }

    fn report(&self, summary: &CycleSummary) {
        if summary.terminal_errors.is_empty() {
            info!(
                imported = summary.imported,
                suppressed = summary.suppressed,
                synced = summary.synced,
                "sync cycle finished"
            );
            self.notifier.emit(
                &format!(
                    "Sync finished: {} new, {} synced, {} duplicates",
                    summary.imported, summary.synced, summary.duplicates
                ),
                Severity::Info,
                "sync",
            );
        } else {
            self.notifier.emit(
                &format!(
                    "Sync finished with {} failure(s): {}",
                    summary.terminal_errors.len(),
                    summary.terminal_errors.join("; ")
                ),
                Severity::Warning,
                "sync",
            );
        }
    }

    /// Connectivity probe for one registered terminal.
    pub async fn probe_terminal(&self, id: i64) -> Result<()> {
        let terminal = self
            .registry
            .get(id)
            .await?
            .ok_or_else(|| BridgeError::NotFound(format!("terminal {id}")))?;
        self.transport
            .probe(&terminal.host, terminal.port, TERMINAL_PROBE_TIMEOUT)
            .await
    }

    /// Paged ledger listing for the current scope.
    pub async fn list_events(&self, filter: &EventFilter, page: &Page) -> Result<Vec<PunchEvent>> {
        let scope = self.require_scope().await?;
        self.ledger.list_events(Some(&scope), filter, page).await
    }

    /// Reset specific events back to pending for a forced resync.
    pub async fn reset_events(&self, ids: &[i64]) -> Result<usize> {
        self.ledger.reset_status(ids).await
    }

    /// Reset all resettable events in an inclusive local-date range.
    pub async fn reset_events_by_date(
        &self,
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    ) -> Result<usize> {
        let scope = self.require_scope().await?;
        self.ledger.reset_status_by_date(Some(&scope), from, to).await
    }

    /// Delete events older than the retention window.
    pub async fn retention_cleanup(&self, older_than_days: u32) -> Result<usize> {
        let scope = self.require_scope().await?;
        self.ledger.retention_cleanup(older_than_days, Some(&scope)).await
    }

    async fn require_scope(&self) -> Result<String> {
        let Some(credentials) = self.credentials.current().await? else {
            return Err(BridgeError::Config("not connected to a remote instance".to_string()));
        };
        Ok(credentials.scope())
    }
}
