//! Terminal provisioning: keeps the local registry and the remote device
//! directory in step.
//!
//! The remote directory is the source of truth; the local registry is an
//! offline cache so ingest keeps working while the remote side is down.
//! Remote calls here are best-effort: a failed registration or disable is
//! logged and the local change still goes through, and the next refresh
//! converges the two sides.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use punchbridge_domain::{BridgeError, NewTerminal, Result, Terminal};

use crate::ledger_ports::TerminalRegistry;
use crate::sync::ports::RemoteTerminalDirectory;

pub struct ProvisioningService {
    remote: Arc<dyn RemoteTerminalDirectory>,
    registry: Arc<dyn TerminalRegistry>,
}

impl ProvisioningService {
    pub fn new(remote: Arc<dyn RemoteTerminalDirectory>, registry: Arc<dyn TerminalRegistry>) -> Self {
        Self { remote, registry }
    }

    /// Register a terminal remotely and cache it locally. Returns the local
    /// id even when the remote call fails.
    #[instrument(skip_all, fields(name = %terminal.name, host = %terminal.host))]
    pub async fn add_terminal(&self, terminal: &NewTerminal) -> Result<i64> {
        if terminal.host.trim().is_empty() {
            return Err(BridgeError::InvalidInput("terminal host must not be empty".to_string()));
        }

        if let Err(err) = self.remote.register(terminal).await {
            warn!(error = %err, "remote registration failed, caching locally only");
        }
        let id = self.registry.upsert(terminal).await?;
        info!(id, "terminal registered");
        Ok(id)
    }

    /// Pull the remote directory and fold every active terminal into the
    /// local registry, then return the refreshed local list.
    #[instrument(skip(self), fields(scope = scope.unwrap_or("*")))]
    pub async fn refresh(&self, scope: Option<&str>) -> Result<Vec<Terminal>> {
        let remote = self.remote.list_active().await?;
        for device in remote.iter().filter(|d| d.is_active) {
            let new = NewTerminal {
                name: device.device_name.clone(),
                host: device.ip_address.clone(),
                port: device.port,
                location: device.location.clone(),
                comm_key: None,
                prefer_datagram: false,
                scope: scope.map(str::to_string),
            };
            self.registry.upsert(&new).await?;
        }
        self.registry.list(scope).await
    }

    /// Disable the terminal remotely and delete it locally, cascading to
    /// its punch events.
    #[instrument(skip(self))]
    pub async fn remove_terminal(&self, id: i64) -> Result<()> {
        let terminal = self
            .registry
            .get(id)
            .await?
            .ok_or_else(|| BridgeError::NotFound(format!("terminal {id}")))?;

        if let Err(err) = self.remote.disable(&terminal.remote_id()).await {
            warn!(error = %err, terminal = %terminal.name, "remote disable failed");
        }
        self.registry.remove(id).await?;
        info!(id, terminal = %terminal.name, "terminal removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use punchbridge_domain::RemoteTerminal;

    use super::*;

    #[derive(Default)]
    struct MemoryRegistry {
        terminals: Mutex<Vec<Terminal>>,
    }

    #[async_trait]
    impl TerminalRegistry for MemoryRegistry {
        async fn list(&self, _scope: Option<&str>) -> Result<Vec<Terminal>> {
            Ok(self.terminals.lock().expect("mutex poisoned").clone())
        }

        async fn get(&self, id: i64) -> Result<Option<Terminal>> {
            Ok(self
                .terminals
                .lock()
                .expect("mutex poisoned")
                .iter()
                .find(|t| t.id == id)
                .cloned())
        }

        async fn upsert(&self, terminal: &NewTerminal) -> Result<i64> {
            let mut terminals = self.terminals.lock().expect("mutex poisoned");
            if let Some(existing) = terminals
                .iter_mut()
                .find(|t| t.host == terminal.host && t.port == terminal.port)
            {
                existing.name = terminal.name.clone();
                if terminal.location.is_some() {
                    existing.location = terminal.location.clone();
                }
                return Ok(existing.id);
            }
            let id = i64::try_from(terminals.len()).expect("fits") + 1;
            terminals.push(Terminal {
                id,
                name: terminal.name.clone(),
                host: terminal.host.clone(),
                port: terminal.port,
                location: terminal.location.clone(),
                comm_key: terminal.comm_key.clone(),
                prefer_datagram: terminal.prefer_datagram,
                scope: terminal.scope.clone(),
            });
            Ok(id)
        }

        async fn remove(&self, id: i64) -> Result<()> {
            self.terminals
                .lock()
                .expect("mutex poisoned")
                .retain(|t| t.id != id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockDirectory {
        active: Vec<RemoteTerminal>,
        fail_register: bool,
        disabled: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RemoteTerminalDirectory for MockDirectory {
        async fn register(&self, terminal: &NewTerminal) -> Result<RemoteTerminal> {
            if self.fail_register {
                return Err(BridgeError::Network("remote unreachable".to_string()));
            }
            Ok(RemoteTerminal {
                device_id: format!("{}:{}", terminal.host, terminal.port),
                device_name: terminal.name.clone(),
                ip_address: terminal.host.clone(),
                port: terminal.port,
                location: terminal.location.clone(),
                is_active: true,
            })
        }

        async fn list_active(&self) -> Result<Vec<RemoteTerminal>> {
            Ok(self.active.clone())
        }

        async fn disable(&self, remote_id: &str) -> Result<()> {
            self.disabled
                .lock()
                .expect("mutex poisoned")
                .push(remote_id.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn add_terminal_caches_locally_even_when_remote_fails() {
        let registry = Arc::new(MemoryRegistry::default());
        let svc = ProvisioningService::new(
            Arc::new(MockDirectory { fail_register: true, ..Default::default() }),
            registry.clone(),
        );

        let id = svc
            .add_terminal(&NewTerminal::new("lobby", "10.0.0.5"))
            .await
            .expect("cached locally");

        assert_eq!(id, 1);
        assert_eq!(registry.terminals.lock().expect("mutex poisoned").len(), 1);
    }

    #[tokio::test]
    async fn add_terminal_rejects_empty_host() {
        let svc = ProvisioningService::new(
            Arc::new(MockDirectory::default()),
            Arc::new(MemoryRegistry::default()),
        );

        let err = svc
            .add_terminal(&NewTerminal::new("lobby", "  "))
            .await
            .expect_err("must reject");
        assert!(matches!(err, BridgeError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn refresh_folds_active_remote_terminals_into_the_registry() {
        let registry = Arc::new(MemoryRegistry::default());
        let remote = MockDirectory {
            active: vec![
                RemoteTerminal {
                    device_id: "10.0.0.5:4370".to_string(),
                    device_name: "lobby".to_string(),
                    ip_address: "10.0.0.5".to_string(),
                    port: 4370,
                    location: Some("front desk".to_string()),
                    is_active: true,
                },
                RemoteTerminal {
                    device_id: "10.0.0.9:4370".to_string(),
                    device_name: "old dock".to_string(),
                    ip_address: "10.0.0.9".to_string(),
                    port: 4370,
                    location: None,
                    is_active: false,
                },
            ],
            ..Default::default()
        };
        let svc = ProvisioningService::new(Arc::new(remote), registry.clone());

        let terminals = svc
            .refresh(Some("https://erp.example.com"))
            .await
            .expect("refresh runs");

        // Inactive remote terminals are not pulled into the cache.
        assert_eq!(terminals.len(), 1);
        assert_eq!(terminals[0].name, "lobby");
        assert_eq!(terminals[0].location.as_deref(), Some("front desk"));
    }

    #[tokio::test]
    async fn remove_terminal_disables_remotely_then_deletes_locally() {
        let registry = Arc::new(MemoryRegistry::default());
        let remote = Arc::new(MockDirectory::default());
        let svc = ProvisioningService::new(remote.clone(), registry.clone());

        let id = svc
            .add_terminal(&NewTerminal::new("lobby", "10.0.0.5"))
            .await
            .expect("added");
        svc.remove_terminal(id).await.expect("removed");

        assert!(registry.terminals.lock().expect("mutex poisoned").is_empty());
        assert_eq!(
            *remote.disabled.lock().expect("mutex poisoned"),
            vec!["10.0.0.5:4370".to_string()]
        );
    }

    #[tokio::test]
    async fn remove_unknown_terminal_is_not_found() {
        let svc = ProvisioningService::new(
            Arc::new(MockDirectory::default()),
            Arc::new(MemoryRegistry::default()),
        );

        let err = svc.remove_terminal(99).await.expect_err("must fail");
        assert!(matches!(err, BridgeError::NotFound(_)));
    }
}
