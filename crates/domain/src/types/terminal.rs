//! Terminal (physical device) model types

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_TERMINAL_PORT;

/// A configured attendance terminal, as cached in the local registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terminal {
    pub id: i64,
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Human-readable location string, mirrored from the remote directory.
    pub location: Option<String>,
    /// Shared communication secret, when the device requires one.
    pub comm_key: Option<String>,
    /// Prefer the datagram protocol over the stream protocol.
    pub prefer_datagram: bool,
    /// Base URL of the remote instance this terminal belongs to. The local
    /// cache may serve several remote deployments over its lifetime; the
    /// scope keeps their data apart.
    pub scope: Option<String>,
}

impl Terminal {
    /// Identifier used by the remote directory (`host:port`).
    pub fn remote_id(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Insert/update form of [`Terminal`].
///
/// Optional fields are merged on re-registration: a `None` here never
/// overwrites a previously stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTerminal {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub location: Option<String>,
    pub comm_key: Option<String>,
    pub prefer_datagram: bool,
    pub scope: Option<String>,
}

impl NewTerminal {
    /// Minimal terminal with defaults for everything but name and host.
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: DEFAULT_TERMINAL_PORT,
            location: None,
            comm_key: None,
            prefer_datagram: false,
            scope: None,
        }
    }
}
