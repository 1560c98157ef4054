use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

pub mod logging;

// ============================================================================
// Roles
// ============================================================================

/// Role of a user account. Drives authorization and notification buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Client,
    Employee,
    Manager,
    Admin,
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Client
    }
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Employee => "employee",
            Self::Manager => "manager",
            Self::Admin => "admin",
        }
    }

    /// Employees and managers belong to exactly one department
    pub fn requires_department(&self) -> bool {
        matches!(self, Self::Employee | Self::Manager)
    }

    /// Clients and admins never carry a department
    pub fn forbids_department(&self) -> bool {
        matches!(self, Self::Client | Self::Admin)
    }

    /// Roles that can hold a complaint as its assignee
    pub fn can_be_assignee(&self) -> bool {
        matches!(self, Self::Employee | Self::Manager)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct ParseRoleError(pub String);

impl FromStr for UserRole {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "employee" => Ok(Self::Employee),
            "manager" => Ok(Self::Manager),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}

// ============================================================================
// Complaint lifecycle
// ============================================================================

/// Lifecycle stage of a complaint. The wire strings are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ComplaintStatus {
    #[serde(rename = "New")]
    New,
    #[serde(rename = "Assigned")]
    Assigned,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "Done")]
    Done,
    #[serde(rename = "Closed")]
    Closed,
}

impl Default for ComplaintStatus {
    fn default() -> Self {
        Self::New
    }
}

impl ComplaintStatus {
    pub fn all() -> [ComplaintStatus; 6] {
        [
            Self::New,
            Self::Assigned,
            Self::InProgress,
            Self::Completed,
            Self::Done,
            Self::Closed,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Assigned => "Assigned",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Done => "Done",
            Self::Closed => "Closed",
        }
    }

    /// Open complaints still need work from their assignee
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Done | Self::Closed)
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid status '{0}', expected one of: New, Assigned, In Progress, Completed, Done, Closed")]
pub struct ParseStatusError(pub String);

impl FromStr for ComplaintStatus {
    type Err = ParseStatusError;

    /// Exact match on the wire strings; anything else is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

// ============================================================================
// Notification events
// ============================================================================

/// Event that triggers a notification fan-out.
///
/// Unrecognized names are kept as `Other` so the recipient policy can fall
/// back to its default bucket set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationEvent {
    Created,
    Assigned,
    Reassigned,
    StatusChanged,
    CommentAdded,
    Other(String),
}

impl NotificationEvent {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Assigned => "assigned",
            Self::Reassigned => "reassigned",
            Self::StatusChanged => "status_changed",
            Self::CommentAdded => "comment_added",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for NotificationEvent {
    fn from(value: &str) -> Self {
        match value {
            "created" => Self::Created,
            "assigned" => Self::Assigned,
            "reassigned" => Self::Reassigned,
            "status_changed" => Self::StatusChanged,
            "comment_added" => Self::CommentAdded,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for NotificationEvent {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<NotificationEvent> for String {
    fn from(value: NotificationEvent) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_strings() {
        assert_eq!(
            serde_json::to_string(&ComplaintStatus::InProgress).unwrap(),
            "\"In Progress\""
        );
        let parsed: ComplaintStatus = serde_json::from_str("\"Closed\"").unwrap();
        assert_eq!(parsed, ComplaintStatus::Closed);
    }

    #[test]
    fn test_status_parse_rejects_unknown_values() {
        assert_eq!("In Progress".parse::<ComplaintStatus>().unwrap(), ComplaintStatus::InProgress);
        assert!("in progress".parse::<ComplaintStatus>().is_err());
        assert!("Reopened".parse::<ComplaintStatus>().is_err());
        assert!("".parse::<ComplaintStatus>().is_err());
        assert!(serde_json::from_str::<ComplaintStatus>("\"Pending\"").is_err());
    }

    #[test]
    fn test_open_statuses() {
        assert!(ComplaintStatus::New.is_open());
        assert!(ComplaintStatus::Completed.is_open());
        assert!(!ComplaintStatus::Done.is_open());
        assert!(!ComplaintStatus::Closed.is_open());
    }

    #[test]
    fn test_role_department_rules() {
        assert!(UserRole::Employee.requires_department());
        assert!(UserRole::Manager.requires_department());
        assert!(UserRole::Client.forbids_department());
        assert!(UserRole::Admin.forbids_department());
        assert_eq!(serde_json::to_string(&UserRole::Manager).unwrap(), "\"manager\"");
        assert_eq!("ADMIN".parse::<UserRole>().unwrap(), UserRole::Admin);
    }

    #[test]
    fn test_notification_event_round_trip_through_strings() {
        let event: NotificationEvent = serde_json::from_str("\"status_changed\"").unwrap();
        assert_eq!(event, NotificationEvent::StatusChanged);

        let unknown: NotificationEvent = serde_json::from_str("\"escalated\"").unwrap();
        assert_eq!(unknown, NotificationEvent::Other("escalated".to_string()));
        assert_eq!(serde_json::to_string(&unknown).unwrap(), "\"escalated\"");
    }
}
