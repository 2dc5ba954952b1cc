//! Remote system (ERP) payload and outcome types

use serde::{Deserialize, Serialize};

use super::event::PunchDirection;

/// Authentication material for the remote system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum RemoteAuth {
    /// API key/secret pair (`Authorization: token key:secret`).
    Token { key: String, secret: String },
    /// Session cookie captured by the excluded login layer.
    Session { sid: String },
}

/// Remote endpoint plus credentials for the active scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCredentials {
    pub base_url: String,
    pub auth: RemoteAuth,
}

impl RemoteCredentials {
    /// Base URL without a trailing slash, used as the ledger scope key.
    pub fn scope(&self) -> String {
        self.base_url.trim_end_matches('/').to_string()
    }
}

/// One subject row from the remote employee directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEmployee {
    /// Canonical identity in the system of record (e.g. `HR-EMP-00001`).
    pub name: String,
    /// Terminal-local badge id configured for this subject, when any.
    pub attendance_device_id: Option<String>,
}

/// A terminal row from the remote device directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTerminal {
    pub device_id: String,
    pub device_name: String,
    pub ip_address: String,
    pub port: u16,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

/// Payload for creating one checkin record remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinPayload {
    pub employee: String,
    /// Local wall-clock time in `YYYY-MM-DD HH:MM:SS` form.
    pub time: String,
    pub log_type: PunchDirection,
    pub device_id: String,
}

/// Typed result of a remote create attempt. Transient failures are carried
/// as errors instead, so a `PushOutcome` is always a definitive answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Remote created the record.
    Created,
    /// Remote already has an equivalent record for this subject and time.
    Duplicate,
    /// Remote does not know the referenced employee.
    UnknownEmployee,
}

/// Classification of pushing one ledger record, as reported in logs and the
/// cycle summary. Ephemeral; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Accepted,
    AlreadyExists,
    IdentityUnresolved,
    TransientFailure,
}
