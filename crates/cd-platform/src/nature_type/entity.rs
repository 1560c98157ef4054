//! Nature Type Entity
//!
//! Classification tag for complaints. Names are unique ignoring case and
//! types are retired by deactivation, never removed.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NatureType {
    #[serde(rename = "_id")]
    pub id: String,

    pub name: String,

    /// Lower-cased name, unique
    pub name_key: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_active")]
    pub is_active: bool,

    pub created_by: String,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl NatureType {
    pub fn new(name: &str, created_by: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: crate::TsidGenerator::generate(),
            name: name.trim().to_string(),
            name_key: name_key(name),
            description: String::new(),
            is_active: true,
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn rename(&mut self, name: &str) {
        self.name = name.trim().to_string();
        self.name_key = name_key(name);
        self.updated_at = Utc::now();
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }
}

pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}
