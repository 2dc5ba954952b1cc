//! Port interfaces for the remote system of record and the excluded UI
//! layer.

use async_trait::async_trait;
use punchbridge_domain::{
    CheckinPayload, NewTerminal, PushOutcome, RemoteCredentials, RemoteEmployee, RemoteTerminal,
    Result, Severity,
};

/// Remote employee directory, used to map terminal-local subject ids to
/// canonical identities.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Fetch the full directory. Callers rebuild their mapping from this
    /// every cycle; remote identity assignments change between cycles and
    /// staleness would silently misattribute punches.
    async fn fetch_directory(&self) -> Result<Vec<RemoteEmployee>>;
}

/// Remote checkin records in the system of record.
///
/// A `PushOutcome` is always a definitive classification; transient
/// failures (network, 5xx, unrecognized rejections) surface as `Err` so the
/// caller can leave the record pending for the next cycle.
#[async_trait]
pub trait RemoteCheckins: Send + Sync {
    /// Inexpensive pre-check for an equivalent remote record. Avoids
    /// relying solely on rejection-message parsing, which is brittle across
    /// remote-system versions.
    async fn checkin_exists(&self, employee: &str, local_time: &str) -> Result<bool>;

    /// Create one checkin record.
    async fn create_checkin(&self, payload: &CheckinPayload) -> Result<PushOutcome>;
}

/// Remote terminal directory: the remote system is the source of truth for
/// configured terminals, the local registry is the offline cache.
#[async_trait]
pub trait RemoteTerminalDirectory: Send + Sync {
    /// Create or update a terminal remotely (idempotent by address).
    async fn register(&self, terminal: &NewTerminal) -> Result<RemoteTerminal>;

    /// All active terminals for the current instance.
    async fn list_active(&self) -> Result<Vec<RemoteTerminal>>;

    /// Soft-delete a terminal remotely.
    async fn disable(&self, remote_id: &str) -> Result<()>;
}

/// Supplies the remote endpoint and auth for the active scope. Owned by the
/// excluded UI/platform layer.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Current credentials, or `None` when the operator has not logged in.
    async fn current(&self) -> Result<Option<RemoteCredentials>>;
}

/// Sink for user-facing notifications. Fire-and-forget: implementations
/// must not block and the core never awaits an acknowledgement.
pub trait NotificationSink: Send + Sync {
    fn emit(&self, message: &str, severity: Severity, source: &str);
}
