//! Notification sink that forwards user-facing messages to the log.
//!
//! The desktop shell replaces this with a toast-backed sink; headless
//! deployments keep it so cycle outcomes still land somewhere visible.

use punchbridge_core::NotificationSink;
use punchbridge_domain::Severity;
use tracing::{error, info, warn};

#[derive(Debug, Default)]
pub struct TracingNotificationSink;

impl TracingNotificationSink {
    pub fn new() -> Self {
        Self
    }
}

impl NotificationSink for TracingNotificationSink {
    fn emit(&self, message: &str, severity: Severity, source: &str) {
        match severity {
            Severity::Info => info!(source, "{message}"),
            Severity::Warning => warn!(source, "{message}"),
            Severity::Error => error!(source, "{message}"),
        }
    }
}
