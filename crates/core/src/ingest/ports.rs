//! Port interface for terminal communication

use std::time::Duration;

use async_trait::async_trait;
use punchbridge_domain::{DateRange, RawPunch, Result, Terminal};

/// Trait for talking to one physical attendance terminal.
///
/// Implementations must attempt a clean session teardown on every path,
/// including failures, so terminal connection slots are not exhausted.
#[async_trait]
pub trait TerminalTransport: Send + Sync {
    /// Pure connectivity probe: no protocol handshake, used for UI "ping"
    /// feedback only.
    async fn probe(&self, host: &str, port: u16, timeout: Duration) -> Result<()>;

    /// Retrieve the terminal's attendance buffer, falling back between the
    /// stream and datagram protocols. When `range` is given, records are
    /// filtered by local calendar date, inclusive on both bounds.
    async fn fetch_records(
        &self,
        terminal: &Terminal,
        range: Option<&DateRange>,
    ) -> Result<Vec<RawPunch>>;
}
