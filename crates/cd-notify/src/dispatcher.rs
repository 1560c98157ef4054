//! Dispatcher
//!
//! Sends one message to a list of recipients, one at a time, pausing
//! between consecutive sends. A failure for one recipient never stops the
//! rest.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexSet;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::gateway::{GatewayConfig, MessageGateway};

/// Outcome of one dispatch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    /// Distinct chat addresses a send was attempted for
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
    /// Inputs dropped by normalization or deduplication
    pub skipped: usize,
}

pub struct Dispatcher {
    gateway: Arc<dyn MessageGateway>,
    config: GatewayConfig,
}

impl Dispatcher {
    pub fn new(gateway: Arc<dyn MessageGateway>, config: &GatewayConfig) -> Self {
        Self {
            gateway,
            config: config.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.gateway.is_configured()
    }

    /// Interval between consecutive sends
    pub fn send_interval(&self) -> Duration {
        self.config.send_interval
    }

    /// Normalize recipients and drop duplicates, keeping first-seen order.
    pub fn chat_ids(&self, recipients: &[String]) -> Vec<String> {
        recipients
            .iter()
            .filter_map(|raw| self.config.normalize(raw))
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    pub async fn dispatch(&self, message: &str, recipients: &[String]) -> DispatchReport {
        if !self.gateway.is_configured() {
            warn!(
                recipients = recipients.len(),
                "WhatsApp gateway not configured, skipping dispatch"
            );
            return DispatchReport {
                skipped: recipients.len(),
                ..Default::default()
            };
        }

        let chat_ids = self.chat_ids(recipients);
        let mut report = DispatchReport {
            attempted: chat_ids.len(),
            skipped: recipients.len() - chat_ids.len(),
            ..Default::default()
        };

        for (index, chat_id) in chat_ids.iter().enumerate() {
            if index > 0 && !self.config.send_interval.is_zero() {
                tokio::time::sleep(self.config.send_interval).await;
            }

            match self.gateway.send(chat_id, message).await {
                Ok(()) => {
                    report.sent += 1;
                    debug!(chat_id = %chat_id, "Notification sent");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(chat_id = %chat_id, error = %e, "Notification send failed");
                }
            }
        }

        info!(
            attempted = report.attempted,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            "Notification dispatch finished"
        );

        report
    }
}
