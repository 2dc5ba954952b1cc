//! Punch normalizer: raw terminal records to canonical punches.
//!
//! Vendor terminals tag each record with a small event-type code
//! (0 = check-in, 1 = check-out, 2 = break-out, 3 = break-in,
//! 4 = overtime-in, 5 = overtime-out). Operators rarely press the right
//! function key, so the code is untrustworthy and is dropped here: the
//! stored direction always comes from the double-punch filter's alternation
//! state, which starts at IN for a subject with no history.

use chrono::NaiveDateTime;
use punchbridge_domain::RawPunch;

/// A raw punch reduced to the fields the ingest pipeline stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPunch {
    pub subject_id: String,
    pub timestamp: NaiveDateTime,
}

/// Normalize a raw batch, sorted ascending by timestamp so downstream
/// alternation state is built in event order.
pub fn normalize_batch(raw: Vec<RawPunch>) -> Vec<NormalizedPunch> {
    let mut normalized: Vec<NormalizedPunch> = raw
        .into_iter()
        .map(|r| NormalizedPunch { subject_id: r.subject_id, timestamp: r.timestamp })
        .collect();
    normalized.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    normalized
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap().and_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn batch_is_sorted_by_timestamp() {
        let raw = vec![
            RawPunch { subject_id: "7".into(), timestamp: ts(17, 0, 0), kind_code: 1 },
            RawPunch { subject_id: "7".into(), timestamp: ts(9, 0, 0), kind_code: 0 },
        ];
        let normalized = normalize_batch(raw);
        assert_eq!(normalized[0].timestamp, ts(9, 0, 0));
        assert_eq!(normalized[1].timestamp, ts(17, 0, 0));
        assert_eq!(normalized[1].subject_id, "7");
    }

    #[test]
    fn vendor_event_codes_are_discarded() {
        let raw = vec![
            RawPunch { subject_id: "a".into(), timestamp: ts(9, 0, 0), kind_code: 5 },
            RawPunch { subject_id: "b".into(), timestamp: ts(9, 0, 1), kind_code: 255 },
        ];
        let normalized = normalize_batch(raw);
        assert_eq!(
            normalized,
            vec![
                NormalizedPunch { subject_id: "a".into(), timestamp: ts(9, 0, 0) },
                NormalizedPunch { subject_id: "b".into(), timestamp: ts(9, 0, 1) },
            ]
        );
    }
}
