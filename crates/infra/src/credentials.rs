//! In-process credential provider.
//!
//! The login flow (owned by the shell layer) pushes credentials in after a
//! successful sign-in and clears them on sign-out; everything else reads
//! through the `CredentialProvider` port.

use std::sync::RwLock;

use async_trait::async_trait;
use punchbridge_core::CredentialProvider;
use punchbridge_domain::{BridgeError, RemoteCredentials, Result};

#[derive(Debug, Default)]
pub struct StaticCredentialProvider {
    current: RwLock<Option<RemoteCredentials>>,
}

impl StaticCredentialProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider pre-loaded with credentials, for tests and headless use.
    pub fn with_credentials(credentials: RemoteCredentials) -> Self {
        Self { current: RwLock::new(Some(credentials)) }
    }

    /// Install credentials after a successful sign-in.
    pub fn set(&self, credentials: RemoteCredentials) -> Result<()> {
        let mut guard = self
            .current
            .write()
            .map_err(|_| BridgeError::Internal("credential lock poisoned".to_string()))?;
        *guard = Some(credentials);
        Ok(())
    }

    /// Clear credentials on sign-out.
    pub fn clear(&self) -> Result<()> {
        let mut guard = self
            .current
            .write()
            .map_err(|_| BridgeError::Internal("credential lock poisoned".to_string()))?;
        *guard = None;
        Ok(())
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn current(&self) -> Result<Option<RemoteCredentials>> {
        let guard = self
            .current
            .read()
            .map_err(|_| BridgeError::Internal("credential lock poisoned".to_string()))?;
        Ok(guard.clone())
    }
}

#[cfg(test)]
mod tests {
    use punchbridge_domain::RemoteAuth;

    use super::*;

    fn creds() -> RemoteCredentials {
        RemoteCredentials {
            base_url: "https://erp.example.com".to_string(),
            auth: RemoteAuth::Token { key: "k".to_string(), secret: "s".to_string() },
        }
    }

    #[tokio::test]
    async fn starts_empty_and_tracks_set_and_clear() {
        let provider = StaticCredentialProvider::new();
        assert!(provider.current().await.expect("readable").is_none());

        provider.set(creds()).expect("set");
        assert!(provider.current().await.expect("readable").is_some());

        provider.clear().expect("clear");
        assert!(provider.current().await.expect("readable").is_none());
    }
}
