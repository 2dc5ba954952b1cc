//! Common data types used throughout the application

pub mod config;
pub mod event;
pub mod remote;
pub mod terminal;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_DOUBLE_PUNCH_THRESHOLD_SECS;
use event::SyncStatus;

/// Inclusive local-calendar-date bounds for a fetch or reset operation.
///
/// Bounds are compared against the calendar date of each event's wall-clock
/// timestamp, not a UTC instant, because terminal clocks are assumed to run
/// in the operator's local timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// True when `date` falls inside the (inclusive) bounds.
    pub fn contains(&self, date: NaiveDate) -> bool {
        if let Some(from) = self.from {
            if date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if date > to {
                return false;
            }
        }
        true
    }
}

/// Options for one sync cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleOptions {
    /// Double-punch suppression window in seconds; 0 disables the filter.
    pub double_punch_threshold_secs: u64,
    /// Optional date range applied to terminal fetches.
    pub date_range: Option<DateRange>,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            double_punch_threshold_secs: DEFAULT_DOUBLE_PUNCH_THRESHOLD_SECS,
            date_range: None,
        }
    }
}

/// Aggregate result of one full fetch-and-reconcile cycle.
///
/// This is the entire contract the UI layer consumes: counts plus
/// per-terminal error strings. Record-level failures are folded into the
/// counts; nothing is raised past the cycle boundary except configuration
/// errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleSummary {
    /// Genuinely new punch events written to the ledger this cycle.
    pub imported: usize,
    /// New events written as suppressed double punches.
    pub suppressed: usize,
    /// Events accepted by the remote system this cycle.
    pub synced: usize,
    /// Events the remote system already had.
    pub duplicates: usize,
    /// Events classified as permanent errors (unresolved identity).
    pub errors: usize,
    /// Events left pending for the next cycle after transient failures.
    pub deferred: usize,
    /// One message per terminal whose fetch failed.
    pub terminal_errors: Vec<String>,
}

/// Filters for ledger event listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    pub terminal_id: Option<i64>,
    pub subject_id: Option<String>,
    pub status: Option<SyncStatus>,
}

/// Pagination window for ledger event listings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self { limit: 100, offset: 0 }
    }
}

/// Severity attached to a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_range_bounds_are_inclusive() {
        let range = DateRange {
            from: NaiveDate::from_ymd_opt(2026, 1, 1),
            to: NaiveDate::from_ymd_opt(2026, 1, 31),
        };
        let jan_1 = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let jan_31 = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        let feb_1 = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();

        assert!(range.contains(jan_1));
        assert!(range.contains(jan_31));
        assert!(!range.contains(feb_1));
    }

    #[test]
    fn open_ended_range_accepts_everything() {
        let range = DateRange { from: None, to: None };
        assert!(range.contains(NaiveDate::from_ymd_opt(1999, 12, 31).unwrap()));
    }
}
