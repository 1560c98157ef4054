//! Department Entity
//!
//! The routing unit: every complaint lives in one department and is
//! picked up by its manager or default assignee.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    #[serde(rename = "_id")]
    pub id: String,

    /// Unique
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Active manager-role user heading the department
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<String>,

    /// Fallback assignee when the department has no usable manager
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_assignee_id: Option<String>,

    #[serde(default = "default_active")]
    pub is_active: bool,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Department {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: crate::TsidGenerator::generate(),
            name: name.into().trim().to_string(),
            description: String::new(),
            manager_id: None,
            default_assignee_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_manager(mut self, manager_id: impl Into<String>) -> Self {
        self.manager_id = Some(manager_id.into());
        self
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
