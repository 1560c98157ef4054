//! Use Case Errors
//!
//! Categorized failures of a use case. Each category maps to one HTTP status.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Build an error detail map.
///
/// ```ignore
/// details! { "assigneeId" => &cmd.assignee_id, "role" => assignee.role.as_str() }
/// ```
#[macro_export]
macro_rules! details {
    () => {
        std::collections::HashMap::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = std::collections::HashMap::new();
        $(
            map.insert($key.to_string(), serde_json::json!($value));
        )+
        map
    }};
}

/// - `ValidationError` -> 400
/// - `BusinessRuleViolation` -> 409
/// - `NotFoundError` -> 404
/// - `ForbiddenError` -> 403
/// - `CommitError` -> 500
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UseCaseError {
    ValidationError {
        code: String,
        message: String,
        #[serde(default)]
        details: HashMap<String, serde_json::Value>,
    },

    BusinessRuleViolation {
        code: String,
        message: String,
        #[serde(default)]
        details: HashMap<String, serde_json::Value>,
    },

    NotFoundError {
        code: String,
        message: String,
        #[serde(default)]
        details: HashMap<String, serde_json::Value>,
    },

    /// The actor may see the target but not perform this change on it
    ForbiddenError {
        code: String,
        message: String,
        #[serde(default)]
        details: HashMap<String, serde_json::Value>,
    },

    /// Transaction could not be committed
    CommitError {
        code: String,
        message: String,
        #[serde(default)]
        details: HashMap<String, serde_json::Value>,
    },
}

impl UseCaseError {
    pub fn validation(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            code: code.into(),
            message: message.into(),
            details: HashMap::new(),
        }
    }

    pub fn validation_with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self::ValidationError {
            code: code.into(),
            message: message.into(),
            details,
        }
    }

    pub fn business_rule(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BusinessRuleViolation {
            code: code.into(),
            message: message.into(),
            details: HashMap::new(),
        }
    }

    pub fn business_rule_with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self::BusinessRuleViolation {
            code: code.into(),
            message: message.into(),
            details,
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFoundError {
            code: code.into(),
            message: message.into(),
            details: HashMap::new(),
        }
    }

    pub fn forbidden(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ForbiddenError {
            code: code.into(),
            message: message.into(),
            details: HashMap::new(),
        }
    }

    pub fn commit(message: impl Into<String>) -> Self {
        Self::CommitError {
            code: "COMMIT_FAILED".to_string(),
            message: message.into(),
            details: HashMap::new(),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::ValidationError { code, .. } => code,
            Self::BusinessRuleViolation { code, .. } => code,
            Self::NotFoundError { code, .. } => code,
            Self::ForbiddenError { code, .. } => code,
            Self::CommitError { code, .. } => code,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::ValidationError { message, .. } => message,
            Self::BusinessRuleViolation { message, .. } => message,
            Self::NotFoundError { message, .. } => message,
            Self::ForbiddenError { message, .. } => message,
            Self::CommitError { message, .. } => message,
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::ValidationError { .. } => 400,
            Self::BusinessRuleViolation { .. } => 409,
            Self::NotFoundError { .. } => 404,
            Self::ForbiddenError { .. } => 403,
            Self::CommitError { .. } => 500,
        }
    }
}

impl std::fmt::Display for UseCaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message())
    }
}

impl std::error::Error for UseCaseError {}

/// Repository failures inside a use case are commit-class errors
impl From<crate::PlatformError> for UseCaseError {
    fn from(err: crate::PlatformError) -> Self {
        match err {
            crate::PlatformError::NotFound { entity_type, id } => {
                Self::not_found("NOT_FOUND", format!("{} {} not found", entity_type, id))
            }
            crate::PlatformError::Validation { message } => Self::validation("VALIDATION", message),
            crate::PlatformError::Forbidden { message } => Self::forbidden("FORBIDDEN", message),
            other => Self::commit(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = UseCaseError::validation("TITLE_REQUIRED", "Title is required");
        assert_eq!(err.code(), "TITLE_REQUIRED");
        assert_eq!(err.message(), "Title is required");
        assert_eq!(err.http_status_code(), 400);
    }

    #[test]
    fn test_forbidden_error() {
        let err = UseCaseError::forbidden("OTHER_DEPARTMENT", "Assignee is outside your department");
        assert_eq!(err.http_status_code(), 403);
        assert_eq!(err.to_string(), "[OTHER_DEPARTMENT] Assignee is outside your department");
    }

    #[test]
    fn test_details_macro() {
        let email = "user@example.com";
        let details = details! { "email" => email, "count" => 2 };
        assert_eq!(details.get("email"), Some(&serde_json::json!("user@example.com")));
        assert_eq!(details.get("count"), Some(&serde_json::json!(2)));

        let empty: HashMap<String, serde_json::Value> = details!();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_platform_error_conversion() {
        let err: UseCaseError = crate::PlatformError::not_found("Department", "0HZXEQ5Y8JY5Z").into();
        assert_eq!(err.http_status_code(), 404);

        let err: UseCaseError = crate::PlatformError::internal("socket closed").into();
        assert_eq!(err.http_status_code(), 500);
    }
}
