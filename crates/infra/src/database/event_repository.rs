//! SQLite-backed punch event ledger.
//!
//! Implements the async `EventLedger` port. All queries run on the shared
//! r2d2 pool via `spawn_blocking`. Timestamps are stored as naive local
//! wall-clock text so `date()` comparisons operate on the operator's
//! calendar, and scoping goes through a join on the owning terminal's
//! instance URL.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use punchbridge_domain::constants::LEDGER_TIMESTAMP_FORMAT;
use punchbridge_domain::{
    BridgeError, EventFilter, InsertOutcome, NewPunchEvent, Page, PunchDirection, PunchEvent,
    Result, SyncStatus,
};
use punchbridge_core::EventLedger;
use rusqlite::types::Type;
use rusqlite::{params, Row, ToSql};
use tokio::task;

use super::manager::{map_sql_error, DbManager};
use crate::errors::InfraError;

/// Async event ledger backed by SQLite.
pub struct SqliteEventLedger {
    db: Arc<DbManager>,
}

impl SqliteEventLedger {
    /// Construct a ledger backed by the shared database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EventLedger for SqliteEventLedger {
    async fn insert(&self, event: &NewPunchEvent) -> Result<InsertOutcome> {
        let db = Arc::clone(&self.db);
        let event = event.clone();
        task::spawn_blocking(move || -> Result<InsertOutcome> {
            let conn = db.get_connection()?;
            let timestamp = event.timestamp.format(LEDGER_TIMESTAMP_FORMAT).to_string();

            let changed = conn
                .execute(
                    "INSERT OR IGNORE INTO punch_events
                         (terminal_id, subject_id, timestamp, direction, status)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        event.terminal_id,
                        event.subject_id,
                        timestamp,
                        event.direction.as_str(),
                        event.status.code(),
                    ],
                )
                .map_err(map_sql_error)?;

            if changed > 0 {
                return Ok(InsertOutcome { id: conn.last_insert_rowid(), inserted: true });
            }

            // The uniqueness constraint swallowed the insert; report the
            // existing row's id so callers can still reference it.
            let id = conn
                .query_row(
                    "SELECT id FROM punch_events
                     WHERE terminal_id = ?1 AND subject_id = ?2 AND timestamp = ?3",
                    params![event.terminal_id, event.subject_id, timestamp],
                    |row| row.get(0),
                )
                .map_err(map_sql_error)?;
            Ok(InsertOutcome { id, inserted: false })
        })
        .await
        .map_err(map_join_error)?
    }

    async fn last_event_for(
        &self,
        scope: Option<&str>,
        subject_id: &str,
    ) -> Result<Option<PunchEvent>> {
        let db = Arc::clone(&self.db);
        let scope = scope.map(str::to_string);
        let subject_id = subject_id.to_string();
        task::spawn_blocking(move || -> Result<Option<PunchEvent>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT e.id, e.terminal_id, e.subject_id, e.timestamp, e.direction, e.status
                     FROM punch_events e
                     JOIN terminals t ON t.id = e.terminal_id
                     WHERE e.subject_id = ?1
                       AND (?2 IS NULL OR t.instance_url = ?2)
                       AND e.status != 4
                     ORDER BY e.timestamp DESC
                     LIMIT 1",
                )
                .map_err(map_sql_error)?;

            let mut rows = stmt
                .query_map(params![subject_id, scope], map_event_row)
                .map_err(map_sql_error)?;
            match rows.next() {
                Some(row) => Ok(Some(row.map_err(map_sql_error)?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_join_error)?
    }

    async fn unsynced(&self, limit: usize, scope: Option<&str>) -> Result<Vec<PunchEvent>> {
        let db = Arc::clone(&self.db);
        let scope = scope.map(str::to_string);
        task::spawn_blocking(move || -> Result<Vec<PunchEvent>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT e.id, e.terminal_id, e.subject_id, e.timestamp, e.direction, e.status
                     FROM punch_events e
                     JOIN terminals t ON t.id = e.terminal_id
                     WHERE e.status = 0
                       AND (?1 IS NULL OR t.instance_url = ?1)
                     ORDER BY e.timestamp ASC
                     LIMIT ?2",
                )
                .map_err(map_sql_error)?;

            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            let rows = stmt
                .query_map(params![scope, limit], map_event_row)
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn mark_status(&self, ids: &[i64], status: SyncStatus) -> Result<()> {
        if status == SyncStatus::Pending {
            return Err(BridgeError::InvalidInput(
                "resets to pending go through reset_status".to_string(),
            ));
        }
        if ids.is_empty() {
            return Ok(());
        }

        let db = Arc::clone(&self.db);
        let ids = ids.to_vec();
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let placeholders = id_placeholders(ids.len(), 2);
            let sql = format!("UPDATE punch_events SET status = ?1 WHERE id IN ({placeholders})");
            let code = status.code();
            let mut args: Vec<&dyn ToSql> = vec![&code];
            args.extend(ids.iter().map(|id| id as &dyn ToSql));
            conn.execute(&sql, args.as_slice()).map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn reset_status(&self, ids: &[i64]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let db = Arc::clone(&self.db);
        let ids = ids.to_vec();
        task::spawn_blocking(move || -> Result<usize> {
            let conn = db.get_connection()?;
            let placeholders = id_placeholders(ids.len(), 1);
            // Suppressed rows (status 4) stay put: they are audit records,
            // not failed pushes.
            let sql = format!(
                "UPDATE punch_events SET status = 0
                 WHERE status IN (1, 2, 3) AND id IN ({placeholders})"
            );
            let args: Vec<&dyn ToSql> = ids.iter().map(|id| id as &dyn ToSql).collect();
            conn.execute(&sql, args.as_slice()).map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn reset_status_by_date(
        &self,
        scope: Option<&str>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<usize> {
        let db = Arc::clone(&self.db);
        let scope = scope.map(str::to_string);
        task::spawn_blocking(move || -> Result<usize> {
            let conn = db.get_connection()?;
            conn.execute(
                "UPDATE punch_events SET status = 0
                 WHERE status IN (1, 2, 3)
                   AND date(timestamp) >= ?1 AND date(timestamp) <= ?2
                   AND terminal_id IN (
                       SELECT id FROM terminals WHERE ?3 IS NULL OR instance_url = ?3
                   )",
                params![from.to_string(), to.to_string(), scope],
            )
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn retention_cleanup(&self, older_than_days: u32, scope: Option<&str>) -> Result<usize> {
        let db = Arc::clone(&self.db);
        let scope = scope.map(str::to_string);
        let cutoff = Local::now().naive_local() - Duration::days(i64::from(older_than_days));
        task::spawn_blocking(move || -> Result<usize> {
            let conn = db.get_connection()?;
            conn.execute(
                "DELETE FROM punch_events
                 WHERE timestamp < ?1
                   AND terminal_id IN (
                       SELECT id FROM terminals WHERE ?2 IS NULL OR instance_url = ?2
                   )",
                params![cutoff.format(LEDGER_TIMESTAMP_FORMAT).to_string(), scope],
            )
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_events(
        &self,
        scope: Option<&str>,
        filter: &EventFilter,
        page: &Page,
    ) -> Result<Vec<PunchEvent>> {
        let db = Arc::clone(&self.db);
        let scope = scope.map(str::to_string);
        let filter = filter.clone();
        let page = *page;
        task::spawn_blocking(move || -> Result<Vec<PunchEvent>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT e.id, e.terminal_id, e.subject_id, e.timestamp, e.direction, e.status
                     FROM punch_events e
                     JOIN terminals t ON t.id = e.terminal_id
                     WHERE (?1 IS NULL OR t.instance_url = ?1)
                       AND (?2 IS NULL OR e.terminal_id = ?2)
                       AND (?3 IS NULL OR e.subject_id = ?3)
                       AND (?4 IS NULL OR e.status = ?4)
                     ORDER BY e.timestamp DESC
                     LIMIT ?5 OFFSET ?6",
                )
                .map_err(map_sql_error)?;

            let limit = i64::try_from(page.limit).unwrap_or(i64::MAX);
            let offset = i64::try_from(page.offset).unwrap_or(0);
            let rows = stmt
                .query_map(
                    params![
                        scope,
                        filter.terminal_id,
                        filter.subject_id,
                        filter.status.map(SyncStatus::code),
                        limit,
                        offset,
                    ],
                    map_event_row,
                )
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_event_row(row: &Row<'_>) -> rusqlite::Result<PunchEvent> {
    let timestamp: String = row.get(3)?;
    let timestamp = NaiveDateTime::parse_from_str(&timestamp, LEDGER_TIMESTAMP_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    let direction: String = row.get(4)?;
    let direction = PunchDirection::parse(&direction).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Text,
            format!("unknown direction: {direction}").into(),
        )
    })?;

    let status: i64 = row.get(5)?;
    let status = SyncStatus::from_code(status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            Type::Integer,
            format!("unknown status code: {status}").into(),
        )
    })?;

    Ok(PunchEvent {
        id: row.get(0)?,
        terminal_id: row.get(1)?,
        subject_id: row.get(2)?,
        timestamp,
        direction,
        status,
    })
}

fn id_placeholders(count: usize, first_index: usize) -> String {
    (0..count)
        .map(|i| format!("?{}", first_index + i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn map_join_error(err: tokio::task::JoinError) -> BridgeError {
    BridgeError::from(InfraError::from(err))
}
