//! ComplaintDesk Notifications
//!
//! Fan-out of complaint events to WhatsApp:
//! - `stakeholder` - phone lookup for everyone with a stake in a complaint
//! - `policy` - who gets told about which event
//! - `formatter` - message templates
//! - `gateway` - phone normalization and the WhatsApp HTTP client
//! - `dispatcher` - serial, rate-limited delivery
//! - `queue` - bounded handoff from request handlers to the dispatch loop

pub mod dispatcher;
pub mod formatter;
pub mod gateway;
pub mod policy;
pub mod queue;
pub mod stakeholder;

use serde::{Deserialize, Serialize};

pub use cd_common::{ComplaintStatus, NotificationEvent, UserRole};
pub use dispatcher::{DispatchReport, Dispatcher};
pub use formatter::{short_id, MessageFormatter};
pub use gateway::{
    create_gateway, normalize_phone, GatewayConfig, GatewayError, MessageGateway, NoOpGateway,
    WhatsAppGateway,
};
pub use policy::select_recipients;
pub use queue::{
    spawn_notification_worker, NotificationJob, NotificationQueue, NotificationWorker, QueueError,
    WorkerStats,
};
pub use stakeholder::{resolve_stakeholders, StakeholderDirectory, StakeholderPhones};

/// The fields of a complaint the notification pipeline needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintSnapshot {
    pub id: String,
    pub title: String,
    pub status: ComplaintStatus,
    pub client_id: String,
    pub assignee_id: Option<String>,
    pub department_id: Option<String>,
}

/// The user whose action triggered the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: String,
    pub name: String,
    pub role: UserRole,
}

/// Event-specific values rendered into the message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetails {
    pub old_status: Option<ComplaintStatus>,
    pub new_status: Option<ComplaintStatus>,
    pub previous_assignee: Option<String>,
    pub new_assignee: Option<String>,
    pub comment: Option<String>,
    pub notes: Option<String>,
    /// Staff-only event; the client bucket is never notified
    #[serde(default)]
    pub internal: bool,
}
