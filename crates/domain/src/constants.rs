//! Application-wide constants.

use std::time::Duration;

/// Default TCP/UDP port used by attendance terminals.
pub const DEFAULT_TERMINAL_PORT: u16 = 4370;

/// Default window below which a repeated scan from the same subject is
/// treated as a double punch. Zero disables suppression.
pub const DEFAULT_DOUBLE_PUNCH_THRESHOLD_SECS: u64 = 5;

/// Connect/read timeout for a full terminal session.
pub const TERMINAL_SESSION_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for the bare reachability probe. Deliberately shorter than the
/// session timeout so UI "ping" feedback stays snappy.
pub const TERMINAL_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Timeout for a single remote ERP request.
pub const REMOTE_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of pending events pushed per reconcile pass.
pub const RECONCILE_BATCH_LIMIT: usize = 100;

/// Floor for the scheduler interval; the original system clamped here too.
pub const MIN_SYNC_INTERVAL_SECS: u64 = 60;

/// Timestamp layout used for ledger storage (naive local wall-clock,
/// ISO-8601 without an offset).
pub const LEDGER_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Timestamp layout the remote ERP expects for checkin records.
pub const REMOTE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
