//! System Settings
//!
//! A single document holding the auto-routing configuration.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SYSTEM_SETTINGS_ID: &str = "system";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoRouting {
    #[serde(default)]
    pub enabled: bool,

    /// Departments a new complaint may be routed to
    #[serde(default)]
    pub departments: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSettings {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "type")]
    pub settings_type: String,

    #[serde(default)]
    pub auto_routing: AutoRouting,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_department: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Default for SystemSettings {
    /// Auto-routing off, no default department
    fn default() -> Self {
        Self {
            id: SYSTEM_SETTINGS_ID.to_string(),
            settings_type: SYSTEM_SETTINGS_ID.to_string(),
            auto_routing: AutoRouting::default(),
            default_department: None,
            updated_by: None,
            updated_at: Utc::now(),
        }
    }
}

impl SystemSettings {
    /// Every department id the settings point at
    pub fn referenced_departments(&self) -> Vec<String> {
        let mut ids = self.auto_routing.departments.clone();
        if let Some(default) = &self.default_department {
            if !ids.contains(default) {
                ids.push(default.clone());
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = SystemSettings::default();
        assert_eq!(settings.id, "system");
        assert!(!settings.auto_routing.enabled);
        assert!(settings.referenced_departments().is_empty());
    }

    #[test]
    fn test_referenced_departments_are_unique() {
        let settings = SystemSettings {
            auto_routing: AutoRouting {
                enabled: true,
                departments: vec!["A".to_string(), "B".to_string()],
            },
            default_department: Some("A".to_string()),
            ..Default::default()
        };
        assert_eq!(settings.referenced_departments(), vec!["A", "B"]);
    }
}
