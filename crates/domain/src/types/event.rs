//! Punch event model types
//!
//! These types represent the ledger schema and are used by the repository
//! ports. Timestamps are naive local wall-clock values: terminals report
//! their own clock, which is assumed to match the operator's timezone, so no
//! UTC conversion is performed anywhere in the pipeline.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::impl_status_conversions;

/// Direction of a punch: entering or leaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PunchDirection {
    In,
    Out,
}

impl PunchDirection {
    /// The alternation model: every non-suppressed punch flips direction.
    pub fn toggle(self) -> Self {
        match self {
            Self::In => Self::Out,
            Self::Out => Self::In,
        }
    }

    /// Uppercase wire form (`IN` / `OUT`), as stored in the ledger and sent
    /// to the remote system.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
        }
    }

    /// Parse the uppercase wire form.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "IN" => Some(Self::In),
            "OUT" => Some(Self::Out),
            _ => None,
        }
    }
}

impl std::fmt::Display for PunchDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sync lifecycle of a ledger row.
///
/// The only legal transitions are `Pending` to one of the terminal statuses,
/// plus an operator-driven reset of `{Synced, Duplicate, Error}` back to
/// `Pending`. `Suppressed` rows are audit-only and never leave that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Synced,
    Duplicate,
    Error,
    Suppressed,
}

impl_status_conversions!(SyncStatus {
    Pending => "pending",
    Synced => "synced",
    Duplicate => "duplicate",
    Error => "error",
    Suppressed => "suppressed",
});

impl SyncStatus {
    /// Integer code used for the ledger column.
    pub fn code(self) -> i64 {
        match self {
            Self::Pending => 0,
            Self::Synced => 1,
            Self::Duplicate => 2,
            Self::Error => 3,
            Self::Suppressed => 4,
        }
    }

    /// Decode the ledger column value.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Pending),
            1 => Some(Self::Synced),
            2 => Some(Self::Duplicate),
            3 => Some(Self::Error),
            4 => Some(Self::Suppressed),
            _ => None,
        }
    }

    /// Statuses an operator may reset back to pending.
    pub fn is_resettable(self) -> bool {
        matches!(self, Self::Synced | Self::Duplicate | Self::Error)
    }
}

/// One raw record as read from a terminal's attendance buffer, before
/// normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPunch {
    /// Terminal-local subject identifier (badge number as a string).
    pub subject_id: String,
    /// Terminal wall-clock timestamp.
    pub timestamp: NaiveDateTime,
    /// Vendor event-type code, mapped to a direction by the normalizer.
    pub kind_code: u8,
}

/// A punch event persisted in the local ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunchEvent {
    pub id: i64,
    pub terminal_id: i64,
    pub subject_id: String,
    pub timestamp: NaiveDateTime,
    pub direction: PunchDirection,
    pub status: SyncStatus,
}

/// Insert form of [`PunchEvent`], before the ledger assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPunchEvent {
    pub terminal_id: i64,
    pub subject_id: String,
    pub timestamp: NaiveDateTime,
    pub direction: PunchDirection,
    pub status: SyncStatus,
}

/// Result of a ledger insert.
///
/// `inserted == false` means the uniqueness constraint on
/// (terminal, subject, timestamp) rejected a duplicate. That is an expected
/// outcome, not an error; callers use it to count genuinely new records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    pub id: i64,
    pub inserted: bool,
}
