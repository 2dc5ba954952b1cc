//! End-to-end coverage for the SQLite ledger and terminal registry.
//!
//! Every test runs against a real database file with migrations applied, so
//! the uniqueness constraint, scoping joins, cascades, and status rules are
//! exercised exactly as production sees them.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use punchbridge_core::{EventLedger, TerminalRegistry};
use punchbridge_domain::{
    EventFilter, NewPunchEvent, NewTerminal, Page, PunchDirection, SyncStatus,
};
use punchbridge_infra::{DbManager, SqliteEventLedger, SqliteTerminalRegistry};
use tempfile::TempDir;

struct DbHarness {
    #[allow(dead_code)]
    temp_dir: TempDir,
    ledger: SqliteEventLedger,
    registry: SqliteTerminalRegistry,
}

impl DbHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("temporary directory should be created");
        let db_path = temp_dir.path().join("ledger-integration.db");

        let manager =
            Arc::new(DbManager::new(&db_path, 4).expect("database manager should initialise"));
        manager.run_migrations().expect("schema migrations should apply");

        Self {
            temp_dir,
            ledger: SqliteEventLedger::new(Arc::clone(&manager)),
            registry: SqliteTerminalRegistry::new(manager),
        }
    }

    async fn add_terminal(&self, name: &str, host: &str, scope: Option<&str>) -> i64 {
        let terminal = NewTerminal {
            name: name.to_string(),
            host: host.to_string(),
            port: 4370,
            location: None,
            comm_key: None,
            prefer_datagram: false,
            scope: scope.map(str::to_string),
        };
        self.registry.upsert(&terminal).await.expect("terminal upserted")
    }
}

fn ts(d: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, d)
        .expect("valid date")
        .and_hms_opt(h, m, s)
        .expect("valid time")
}

fn event(terminal_id: i64, subject: &str, timestamp: NaiveDateTime) -> NewPunchEvent {
    NewPunchEvent {
        terminal_id,
        subject_id: subject.to_string(),
        timestamp,
        direction: PunchDirection::In,
        status: SyncStatus::Pending,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_inserts_hit_the_same_row() {
    let db = DbHarness::new();
    let terminal = db.add_terminal("lobby", "10.0.0.5", None).await;

    let first = db.ledger.insert(&event(terminal, "7", ts(10, 9, 0, 0))).await.expect("insert");
    assert!(first.inserted);

    let replay = db.ledger.insert(&event(terminal, "7", ts(10, 9, 0, 0))).await.expect("insert");
    assert!(!replay.inserted);
    assert_eq!(replay.id, first.id);

    // Same key with a different direction is still the same punch.
    let mut flipped = event(terminal, "7", ts(10, 9, 0, 0));
    flipped.direction = PunchDirection::Out;
    let outcome = db.ledger.insert(&flipped).await.expect("insert");
    assert!(!outcome.inserted);
    assert_eq!(outcome.id, first.id);
}

#[tokio::test(flavor = "multi_thread")]
async fn unsynced_returns_pending_oldest_first_within_scope() {
    let db = DbHarness::new();
    let scoped = db.add_terminal("lobby", "10.0.0.5", Some("https://a.example.com")).await;
    let other = db.add_terminal("dock", "10.0.0.9", Some("https://b.example.com")).await;

    db.ledger.insert(&event(scoped, "7", ts(10, 17, 0, 0))).await.expect("insert");
    db.ledger.insert(&event(scoped, "7", ts(10, 9, 0, 0))).await.expect("insert");
    db.ledger.insert(&event(other, "9", ts(10, 8, 0, 0))).await.expect("insert");

    let pending = db
        .ledger
        .unsynced(10, Some("https://a.example.com"))
        .await
        .expect("pending listed");

    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].timestamp, ts(10, 9, 0, 0));
    assert_eq!(pending[1].timestamp, ts(10, 17, 0, 0));
}

#[tokio::test(flavor = "multi_thread")]
async fn mark_status_moves_rows_out_of_pending() {
    let db = DbHarness::new();
    let terminal = db.add_terminal("lobby", "10.0.0.5", None).await;

    let a = db.ledger.insert(&event(terminal, "7", ts(10, 9, 0, 0))).await.expect("insert");
    let b = db.ledger.insert(&event(terminal, "7", ts(10, 17, 0, 0))).await.expect("insert");

    db.ledger.mark_status(&[a.id, b.id], SyncStatus::Synced).await.expect("marked");

    let pending = db.ledger.unsynced(10, None).await.expect("pending listed");
    assert!(pending.is_empty());

    let err = db
        .ledger
        .mark_status(&[a.id], SyncStatus::Pending)
        .await
        .expect_err("pending is not a mark target");
    assert!(matches!(err, punchbridge_domain::BridgeError::InvalidInput(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn reset_skips_suppressed_rows() {
    let db = DbHarness::new();
    let terminal = db.add_terminal("lobby", "10.0.0.5", None).await;

    let synced = db.ledger.insert(&event(terminal, "7", ts(10, 9, 0, 0))).await.expect("insert");
    db.ledger.mark_status(&[synced.id], SyncStatus::Synced).await.expect("marked");

    let mut suppressed = event(terminal, "7", ts(10, 9, 0, 2));
    suppressed.status = SyncStatus::Suppressed;
    let suppressed = db.ledger.insert(&suppressed).await.expect("insert");

    let reset = db
        .ledger
        .reset_status(&[synced.id, suppressed.id])
        .await
        .expect("reset runs");
    assert_eq!(reset, 1);

    let pending = db.ledger.unsynced(10, None).await.expect("pending listed");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, synced.id);
}

#[tokio::test(flavor = "multi_thread")]
async fn reset_by_date_bounds_are_inclusive() {
    let db = DbHarness::new();
    let terminal = db.add_terminal("lobby", "10.0.0.5", None).await;

    for day in [9, 10, 11, 12] {
        let outcome =
            db.ledger.insert(&event(terminal, "7", ts(day, 9, 0, 0))).await.expect("insert");
        db.ledger.mark_status(&[outcome.id], SyncStatus::Error).await.expect("marked");
    }

    let reset = db
        .ledger
        .reset_status_by_date(
            None,
            NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date"),
            NaiveDate::from_ymd_opt(2025, 3, 11).expect("valid date"),
        )
        .await
        .expect("reset runs");
    assert_eq!(reset, 2);

    let pending = db.ledger.unsynced(10, None).await.expect("pending listed");
    let days: Vec<u32> = pending.iter().map(|e| chrono::Datelike::day(&e.timestamp.date())).collect();
    assert_eq!(days, vec![10, 11]);
}

#[tokio::test(flavor = "multi_thread")]
async fn last_event_ignores_suppressed_rows() {
    let db = DbHarness::new();
    let terminal = db.add_terminal("lobby", "10.0.0.5", None).await;

    db.ledger.insert(&event(terminal, "7", ts(10, 9, 0, 0))).await.expect("insert");
    let mut suppressed = event(terminal, "7", ts(10, 9, 0, 2));
    suppressed.status = SyncStatus::Suppressed;
    db.ledger.insert(&suppressed).await.expect("insert");

    let last = db
        .ledger
        .last_event_for(None, "7")
        .await
        .expect("query runs")
        .expect("row found");
    assert_eq!(last.timestamp, ts(10, 9, 0, 0));
}

#[tokio::test(flavor = "multi_thread")]
async fn list_events_filters_and_pages_newest_first() {
    let db = DbHarness::new();
    let terminal = db.add_terminal("lobby", "10.0.0.5", None).await;

    for hour in [8, 9, 10] {
        db.ledger.insert(&event(terminal, "7", ts(10, hour, 0, 0))).await.expect("insert");
    }
    db.ledger.insert(&event(terminal, "9", ts(10, 11, 0, 0))).await.expect("insert");

    let filter = EventFilter { subject_id: Some("7".to_string()), ..EventFilter::default() };
    let page = Page { limit: 2, offset: 0 };
    let events = db.ledger.list_events(None, &filter, &page).await.expect("listed");

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].timestamp, ts(10, 10, 0, 0));
    assert_eq!(events[1].timestamp, ts(10, 9, 0, 0));
}

#[tokio::test(flavor = "multi_thread")]
async fn removing_a_terminal_cascades_to_its_events() {
    let db = DbHarness::new();
    let doomed = db.add_terminal("lobby", "10.0.0.5", None).await;
    let kept = db.add_terminal("dock", "10.0.0.9", None).await;

    db.ledger.insert(&event(doomed, "7", ts(10, 9, 0, 0))).await.expect("insert");
    db.ledger.insert(&event(kept, "9", ts(10, 9, 0, 0))).await.expect("insert");

    db.registry.remove(doomed).await.expect("removed");

    let remaining = db
        .ledger
        .list_events(None, &EventFilter::default(), &Page::default())
        .await
        .expect("listed");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].terminal_id, kept);
}

#[tokio::test(flavor = "multi_thread")]
async fn upsert_merges_optional_fields_by_address() {
    let db = DbHarness::new();

    let first = NewTerminal {
        comm_key: Some("4242".to_string()),
        location: Some("front desk".to_string()),
        ..NewTerminal::new("lobby", "10.0.0.5")
    };
    let id = db.registry.upsert(&first).await.expect("upserted");

    // Re-registration without optional fields must not erase them.
    let refreshed = NewTerminal::new("lobby renamed", "10.0.0.5");
    let same_id = db.registry.upsert(&refreshed).await.expect("upserted");
    assert_eq!(same_id, id);

    let stored = db.registry.get(id).await.expect("query runs").expect("found");
    assert_eq!(stored.name, "lobby renamed");
    assert_eq!(stored.comm_key.as_deref(), Some("4242"));
    assert_eq!(stored.location.as_deref(), Some("front desk"));
}

#[tokio::test(flavor = "multi_thread")]
async fn retention_cleanup_only_deletes_old_rows() {
    let db = DbHarness::new();
    let terminal = db.add_terminal("lobby", "10.0.0.5", None).await;

    let old = NewPunchEvent {
        terminal_id: terminal,
        subject_id: "7".to_string(),
        timestamp: chrono::Local::now().naive_local() - chrono::Duration::days(120),
        direction: PunchDirection::In,
        status: SyncStatus::Synced,
    };
    db.ledger.insert(&old).await.expect("insert");
    let recent = NewPunchEvent {
        timestamp: chrono::Local::now().naive_local() - chrono::Duration::days(3),
        ..old.clone()
    };
    db.ledger.insert(&recent).await.expect("insert");

    let deleted = db.ledger.retention_cleanup(90, None).await.expect("cleanup runs");
    assert_eq!(deleted, 1);

    let remaining = db
        .ledger
        .list_events(None, &EventFilter::default(), &Page::default())
        .await
        .expect("listed");
    assert_eq!(remaining.len(), 1);
}
