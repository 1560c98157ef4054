//! Complaint History Entity
//!
//! Append-only audit trail: one row per status change or (re)assignment.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use cd_common::ComplaintStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Complaint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintHistory {
    #[serde(rename = "_id")]
    pub id: String,

    pub complaint_id: String,

    pub status: ComplaintStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_from: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub changed_by: String,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
}

impl ComplaintHistory {
    fn row(complaint: &Complaint, changed_by: &str, notes: Option<String>) -> Self {
        Self {
            id: crate::TsidGenerator::generate(),
            complaint_id: complaint.id.clone(),
            status: complaint.status,
            assigned_from: None,
            assigned_to: None,
            notes,
            changed_by: changed_by.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// First row of a new complaint
    pub fn created(complaint: &Complaint, changed_by: &str) -> Self {
        let mut row = Self::row(complaint, changed_by, None);
        row.assigned_to = Some(complaint.current_assignee_id.clone());
        row
    }

    pub fn status_change(complaint: &Complaint, changed_by: &str, notes: Option<String>) -> Self {
        Self::row(complaint, changed_by, notes)
    }

    pub fn assignment(
        complaint: &Complaint,
        assigned_from: &str,
        changed_by: &str,
        notes: Option<String>,
    ) -> Self {
        let mut row = Self::row(complaint, changed_by, notes);
        row.assigned_from = Some(assigned_from.to_string());
        row.assigned_to = Some(complaint.current_assignee_id.clone());
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_row_records_assignee() {
        let complaint = Complaint::new("t", "d", "c", "dep", "m");
        let row = ComplaintHistory::created(&complaint, "c");
        assert_eq!(row.status, ComplaintStatus::New);
        assert_eq!(row.assigned_to.as_deref(), Some("m"));
        assert_eq!(row.assigned_from, None);
        assert_eq!(row.complaint_id, complaint.id);
    }

    #[test]
    fn test_assignment_row() {
        let mut complaint = Complaint::new("t", "d", "c", "dep", "m");
        complaint.reassign("e", "dep");
        let row = ComplaintHistory::assignment(&complaint, "m", "admin", Some("load balance".into()));
        assert_eq!(row.status, ComplaintStatus::Assigned);
        assert_eq!(row.assigned_from.as_deref(), Some("m"));
        assert_eq!(row.assigned_to.as_deref(), Some("e"));
        assert_eq!(row.changed_by, "admin");
    }
}
