//! HTTP client for the remote ERP system.
//!
//! Implements the employee directory, checkin, and device directory ports.
//! Checkin creation never reports a transient failure as an outcome: HTTP
//! rejections are classified against the known permanent rejection wordings
//! and everything unrecognized surfaces as an error so the caller retries
//! the record on a later cycle.

use async_trait::async_trait;
use punchbridge_core::{EmployeeDirectory, RemoteCheckins, RemoteTerminalDirectory};
use punchbridge_domain::constants::REMOTE_REQUEST_TIMEOUT;
use punchbridge_domain::{
    BridgeError, CheckinPayload, NewTerminal, PushOutcome, RemoteAuth, RemoteCredentials,
    RemoteEmployee, RemoteTerminal, Result,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::errors::SyncError;
use super::response::{classify_rejection, extract_error_text, parse_list, MethodResponse};

const RESOURCE_EMPLOYEE: &str = "api/resource/Employee";
const RESOURCE_CHECKIN: &str = "api/resource/Employee Checkin";
const METHOD_DEVICE: &str = "api/method/attendance_bridge.api.device";

/// REST client bound to one remote instance.
pub struct ErpClient {
    http: reqwest::Client,
    base_url: String,
    auth: RemoteAuth,
}

/// Body sent when creating a checkin. The coordinate fields are mandatory
/// on the remote side; terminals have no GPS, so they are fixed zeros.
#[derive(Debug, Serialize)]
struct CheckinBody<'a> {
    employee: &'a str,
    time: &'a str,
    log_type: &'a str,
    device_id: &'a str,
    latitude: &'static str,
    longitude: &'static str,
}

#[derive(Debug, Serialize)]
struct RegisterDeviceBody<'a> {
    device_id: String,
    device_name: &'a str,
    ip_address: &'a str,
    port: u16,
    location: Option<&'a str>,
}

impl ErpClient {
    /// Build a client for the given credentials.
    pub fn new(credentials: &RemoteCredentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REMOTE_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BridgeError::Config(format!("failed to build http client: {e}")))?;

        Ok(Self {
            http,
            base_url: credentials.scope(),
            auth: credentials.auth.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            RemoteAuth::Token { key, secret } => {
                request.header("Authorization", format!("token {key}:{secret}"))
            }
            RemoteAuth::Session { sid } => request.header("Cookie", format!("sid={sid}")),
        }
    }

    /// Send with a single immediate retry on retryable failures.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<reqwest::Response, SyncError> {
        let retry = request.try_clone();
        match request.send().await {
            Ok(response) => Ok(response),
            Err(err) => {
                let sync_err = SyncError::from(err);
                if sync_err.should_retry() {
                    if let Some(retry) = retry {
                        debug!(error = %sync_err, "retrying request once");
                        return retry.send().await.map_err(SyncError::from);
                    }
                }
                Err(sync_err)
            }
        }
    }

    async fn get_list<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let request = self.authorize(self.http.get(self.url(path)).query(query));
        let response = self.send(request).await.map_err(BridgeError::from)?;

        let status = response.status();
        let body = response.text().await.map_err(SyncError::from).map_err(BridgeError::from)?;
        if !status.is_success() {
            return Err(SyncError::from_status(status.as_u16(), &extract_error_text(&body)).into());
        }

        parse_list(&body)
            .map_err(|e| BridgeError::Network(format!("malformed list response: {e}")))
    }
}

#[async_trait]
impl EmployeeDirectory for ErpClient {
    #[instrument(skip(self))]
    async fn fetch_directory(&self) -> Result<Vec<RemoteEmployee>> {
        let employees: Vec<RemoteEmployee> = self
            .get_list(
                RESOURCE_EMPLOYEE,
                &[
                    ("fields", r#"["name","attendance_device_id"]"#.to_string()),
                    ("filters", r#"[["status","=","Active"]]"#.to_string()),
                    ("limit_page_length", "0".to_string()),
                ],
            )
            .await?;
        debug!(count = employees.len(), "employee directory fetched");
        Ok(employees)
    }
}

#[async_trait]
impl RemoteCheckins for ErpClient {
    async fn checkin_exists(&self, employee: &str, local_time: &str) -> Result<bool> {
        // Built through the serializer: employee names may contain quotes.
        let filters =
            serde_json::json!([["employee", "=", employee], ["time", "=", local_time]])
                .to_string();
        let rows: Vec<Value> = self
            .get_list(
                RESOURCE_CHECKIN,
                &[
                    ("fields", r#"["name"]"#.to_string()),
                    ("filters", filters),
                    ("limit_page_length", "1".to_string()),
                ],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    #[instrument(skip(self, payload), fields(employee = %payload.employee))]
    async fn create_checkin(&self, payload: &CheckinPayload) -> Result<PushOutcome> {
        let body = CheckinBody {
            employee: &payload.employee,
            time: &payload.time,
            log_type: payload.log_type.as_str(),
            device_id: &payload.device_id,
            latitude: "0.000000",
            longitude: "0.000000",
        };
        let request = self.authorize(self.http.post(self.url(RESOURCE_CHECKIN)).json(&body));
        let response = self.send(request).await.map_err(BridgeError::from)?;

        let status = response.status();
        if status.is_success() {
            return Ok(PushOutcome::Created);
        }

        let text = response.text().await.map_err(SyncError::from).map_err(BridgeError::from)?;
        if let Some(outcome) = classify_rejection(&text) {
            return Ok(outcome);
        }
        warn!(status = status.as_u16(), "unclassified checkin rejection");
        Err(SyncError::from_status(status.as_u16(), &extract_error_text(&text)).into())
    }
}

#[async_trait]
impl RemoteTerminalDirectory for ErpClient {
    #[instrument(skip_all, fields(name = %terminal.name))]
    async fn register(&self, terminal: &NewTerminal) -> Result<RemoteTerminal> {
        let body = RegisterDeviceBody {
            device_id: format!("{}:{}", terminal.host, terminal.port),
            device_name: &terminal.name,
            ip_address: &terminal.host,
            port: terminal.port,
            location: terminal.location.as_deref(),
        };
        let path = format!("{METHOD_DEVICE}.register_device");
        let request = self.authorize(self.http.post(self.url(&path)).json(&body));
        let response = self.send(request).await.map_err(BridgeError::from)?;

        let status = response.status();
        let text = response.text().await.map_err(SyncError::from).map_err(BridgeError::from)?;
        if !status.is_success() {
            return Err(SyncError::from_status(status.as_u16(), &extract_error_text(&text)).into());
        }

        // RPC responses wrap the record under `message`; tolerate a bare
        // record too.
        if let Ok(wrapped) = serde_json::from_str::<MethodResponse<RemoteTerminal>>(&text) {
            return Ok(wrapped.message);
        }
        serde_json::from_str::<RemoteTerminal>(&text)
            .map_err(|e| BridgeError::Network(format!("malformed register response: {e}")))
    }

    async fn list_active(&self) -> Result<Vec<RemoteTerminal>> {
        let path = format!("{METHOD_DEVICE}.list_devices");
        let devices: Vec<RemoteTerminal> = self.get_list(&path, &[]).await?;
        Ok(devices.into_iter().filter(|d| d.is_active).collect())
    }

    async fn disable(&self, remote_id: &str) -> Result<()> {
        let path = format!("{METHOD_DEVICE}.disable_device");
        let request = self.authorize(
            self.http
                .post(self.url(&path))
                .json(&serde_json::json!({ "device_id": remote_id })),
        );
        let response = self.send(request).await.map_err(BridgeError::from)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.map_err(SyncError::from).map_err(BridgeError::from)?;
            return Err(SyncError::from_status(status.as_u16(), &extract_error_text(&text)).into());
        }
        Ok(())
    }
}
