//! Double-punch filter: alternation with rapid-rescan suppression.
//!
//! Terminals frequently produce two reads within milliseconds of a single
//! physical scan. Naive alternation would then record a false OUT followed
//! by a false IN. The filter keeps a per-subject "last seen" map across the
//! whole batch (and across cycles, via ledger seeding): a repeat within the
//! threshold is suppressed and keeps the previous direction; any other punch
//! toggles direction, IN when the subject has no history at all.
//!
//! The map is mutated only through [`DoublePunchFilter::observe`], which
//! callers invoke after the ledger confirmed the row was genuinely new, so
//! replayed duplicates cannot corrupt alternation state.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use punchbridge_domain::PunchDirection;

/// Last accepted punch for one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastSeen {
    pub timestamp: NaiveDateTime,
    pub direction: PunchDirection,
}

/// Decision for one incoming punch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PunchDecision {
    pub direction: PunchDirection,
    pub suppressed: bool,
}

/// Stateful per-batch filter. Construct one per cycle.
#[derive(Debug)]
pub struct DoublePunchFilter {
    threshold_secs: i64,
    last_seen: HashMap<String, LastSeen>,
}

impl DoublePunchFilter {
    /// `threshold_secs == 0` disables suppression entirely.
    pub fn new(threshold_secs: u64) -> Self {
        Self {
            threshold_secs: i64::try_from(threshold_secs).unwrap_or(i64::MAX),
            last_seen: HashMap::new(),
        }
    }

    /// Whether the subject already has in-memory state. When this returns
    /// false the caller should seed from the ledger before classifying.
    pub fn contains(&self, subject_id: &str) -> bool {
        self.last_seen.contains_key(subject_id)
    }

    /// Seed a subject's state from persisted history. No-op when the
    /// subject was already observed in this batch.
    pub fn seed(&mut self, subject_id: &str, last: LastSeen) {
        self.last_seen.entry(subject_id.to_string()).or_insert(last);
    }

    /// Classify one punch against the current state without mutating it.
    pub fn classify(&self, subject_id: &str, timestamp: NaiveDateTime) -> PunchDecision {
        let Some(last) = self.last_seen.get(subject_id) else {
            return PunchDecision { direction: PunchDirection::In, suppressed: false };
        };

        let delta = (timestamp - last.timestamp).num_seconds();
        if self.threshold_secs > 0 && delta >= 0 && delta < self.threshold_secs {
            // Same direction as the previous punch, not toggled, so the
            // suppressed audit row stays self-consistent.
            return PunchDecision { direction: last.direction, suppressed: true };
        }

        PunchDecision { direction: last.direction.toggle(), suppressed: false }
    }

    /// Record an accepted (inserted, non-suppressed) punch.
    pub fn observe(&mut self, subject_id: &str, timestamp: NaiveDateTime, direction: PunchDirection) {
        self.last_seen
            .insert(subject_id.to_string(), LastSeen { timestamp, direction });
    }
}
