//! Complaint Entity
//!
//! The authoritative record of a complaint. `status` is the single source
//! of truth for its lifecycle stage.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use cd_common::ComplaintStatus;
use cd_notify::ComplaintSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A file stored through the upload endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    #[serde(rename = "_id")]
    pub id: String,

    pub title: String,

    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_screen: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nature_type_id: Option<String>,

    pub client_id: String,

    pub department_id: String,

    pub current_assignee_id: String,

    pub first_assignee_id: String,

    #[serde(default)]
    pub status: ComplaintStatus,

    #[serde(default)]
    pub attachments: Vec<Attachment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Complaint {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        client_id: impl Into<String>,
        department_id: impl Into<String>,
        assignee_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let assignee_id = assignee_id.into();
        Self {
            id: crate::TsidGenerator::generate(),
            title: title.into(),
            description: description.into(),
            error_type: None,
            error_screen: None,
            nature_type_id: None,
            client_id: client_id.into(),
            department_id: department_id.into(),
            first_assignee_id: assignee_id.clone(),
            current_assignee_id: assignee_id,
            status: ComplaintStatus::New,
            attachments: Vec::new(),
            remark: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `status`, returning the previous one.
    ///
    /// `None` when the complaint already has that status.
    pub fn transition_to(&mut self, status: ComplaintStatus) -> Option<ComplaintStatus> {
        if self.status == status {
            return None;
        }
        let previous = std::mem::replace(&mut self.status, status);
        self.touch();
        Some(previous)
    }

    /// Hand the complaint to another assignee, returning the previous one.
    ///
    /// A `New` complaint becomes `Assigned`; later stages keep their status.
    pub fn reassign(&mut self, assignee_id: &str, department_id: &str) -> Option<String> {
        if self.current_assignee_id == assignee_id {
            return None;
        }
        let previous = std::mem::replace(&mut self.current_assignee_id, assignee_id.to_string());
        self.department_id = department_id.to_string();
        if self.status == ComplaintStatus::New {
            self.status = ComplaintStatus::Assigned;
        }
        self.touch();
        Some(previous)
    }

    pub fn is_assigned_to(&self, user_id: &str) -> bool {
        self.current_assignee_id == user_id
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// The fields the notification pipeline reads
    pub fn snapshot(&self) -> ComplaintSnapshot {
        ComplaintSnapshot {
            id: self.id.clone(),
            title: self.title.clone(),
            status: self.status,
            client_id: self.client_id.clone(),
            assignee_id: Some(self.current_assignee_id.clone()),
            department_id: Some(self.department_id.clone()),
        }
    }
}
