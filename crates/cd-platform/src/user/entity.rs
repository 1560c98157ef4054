//! User Entity
//!
//! A person who can sign in. The role decides what they can see and do;
//! employees and managers belong to exactly one department.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use cd_common::UserRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Channels a user accepts notifications on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    #[serde(default = "default_true")]
    pub whatsapp: bool,
    #[serde(default = "default_true")]
    pub email: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            whatsapp: true,
            email: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,

    /// Lower-cased, unique
    pub email: String,

    pub password_hash: String,

    pub name: String,

    pub role: UserRole,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default)]
    pub notification_preferences: NotificationPreferences,

    #[serde(skip_serializing_if = "Option::is_none", default, with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional")]
    pub last_login_at: Option<DateTime<Utc>>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        role: UserRole,
        password_hash: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: crate::TsidGenerator::generate(),
            email: normalize_email(&email.into()),
            password_hash: password_hash.into(),
            name: name.into(),
            role,
            department_id: None,
            is_active: true,
            phone: None,
            notification_preferences: NotificationPreferences::default(),
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_department(mut self, department_id: impl Into<String>) -> Self {
        self.department_id = Some(department_id.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Active employee or manager
    pub fn can_hold_complaints(&self) -> bool {
        self.is_active && self.role.can_be_assignee()
    }

    pub fn belongs_to(&self, department_id: &str) -> bool {
        self.department_id.as_deref() == Some(department_id)
    }

    /// Phone for WhatsApp delivery, when the user opted in.
    /// Activity is filtered by the bucket queries, not here.
    pub fn whatsapp_phone(&self) -> Option<&str> {
        if !self.notification_preferences.whatsapp {
            return None;
        }
        self.phone.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }

    pub fn record_login(&mut self) {
        self.last_login_at = Some(Utc::now());
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Loose shape check: one `@`, non-empty local part, dotted domain
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
}

/// Department membership rule for a role
pub fn validate_department_for_role(role: UserRole, department_id: Option<&str>) -> Result<(), String> {
    match (department_id, role) {
        (None, r) if r.requires_department() => {
            Err(format!("A department is required for role '{}'", r))
        }
        (Some(_), r) if r.forbids_department() => {
            Err(format!("Role '{}' cannot belong to a department", r))
        }
        _ => Ok(()),
    }
}
