//! SQLite-backed terminal registry.
//!
//! Upserts merge by (host, port): optional fields only overwrite stored
//! values when the incoming row actually carries them, so a refresh from the
//! remote directory cannot wipe a locally configured comm key.

use std::sync::Arc;

use async_trait::async_trait;
use punchbridge_core::TerminalRegistry;
use punchbridge_domain::{BridgeError, NewTerminal, Result, Terminal};
use rusqlite::{params, Row};
use tokio::task;

use super::manager::{map_sql_error, DbManager};
use crate::errors::InfraError;

/// Async terminal registry backed by SQLite.
pub struct SqliteTerminalRegistry {
    db: Arc<DbManager>,
}

impl SqliteTerminalRegistry {
    /// Construct a registry backed by the shared database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TerminalRegistry for SqliteTerminalRegistry {
    async fn list(&self, scope: Option<&str>) -> Result<Vec<Terminal>> {
        let db = Arc::clone(&self.db);
        let scope = scope.map(str::to_string);
        task::spawn_blocking(move || -> Result<Vec<Terminal>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, name, host, port, location, comm_key, prefer_datagram, instance_url
                     FROM terminals
                     WHERE ?1 IS NULL OR instance_url = ?1
                     ORDER BY name",
                )
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![scope], map_terminal_row)
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get(&self, id: i64) -> Result<Option<Terminal>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<Option<Terminal>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, name, host, port, location, comm_key, prefer_datagram, instance_url
                     FROM terminals WHERE id = ?1",
                )
                .map_err(map_sql_error)?;
            let mut rows = stmt
                .query_map(params![id], map_terminal_row)
                .map_err(map_sql_error)?;
            match rows.next() {
                Some(row) => Ok(Some(row.map_err(map_sql_error)?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_join_error)?
    }

    async fn upsert(&self, terminal: &NewTerminal) -> Result<i64> {
        let db = Arc::clone(&self.db);
        let terminal = terminal.clone();
        task::spawn_blocking(move || -> Result<i64> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO terminals (name, host, port, location, comm_key, prefer_datagram, instance_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(host, port) DO UPDATE SET
                     name = excluded.name,
                     location = COALESCE(excluded.location, terminals.location),
                     comm_key = COALESCE(excluded.comm_key, terminals.comm_key),
                     prefer_datagram = excluded.prefer_datagram,
                     instance_url = COALESCE(excluded.instance_url, terminals.instance_url)",
                params![
                    terminal.name,
                    terminal.host,
                    terminal.port,
                    terminal.location,
                    terminal.comm_key,
                    terminal.prefer_datagram,
                    terminal.scope,
                ],
            )
            .map_err(map_sql_error)?;

            conn.query_row(
                "SELECT id FROM terminals WHERE host = ?1 AND port = ?2",
                params![terminal.host, terminal.port],
                |row| row.get(0),
            )
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn remove(&self, id: i64) -> Result<()> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            // ON DELETE CASCADE removes the terminal's punch events.
            let changed = conn
                .execute("DELETE FROM terminals WHERE id = ?1", params![id])
                .map_err(map_sql_error)?;
            if changed == 0 {
                return Err(BridgeError::NotFound(format!("terminal {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_terminal_row(row: &Row<'_>) -> rusqlite::Result<Terminal> {
    Ok(Terminal {
        id: row.get(0)?,
        name: row.get(1)?,
        host: row.get(2)?,
        port: row.get(3)?,
        location: row.get(4)?,
        comm_key: row.get(5)?,
        prefer_datagram: row.get(6)?,
        scope: row.get(7)?,
    })
}

fn map_join_error(err: tokio::task::JoinError) -> BridgeError {
    BridgeError::from(InfraError::from(err))
}
