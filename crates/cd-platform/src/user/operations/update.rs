//! Update User Use Case

use std::sync::Arc;

use cd_common::UserRole;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use tracing::info;

use crate::auth::PasswordService;
use crate::shared::api_common::non_blank;
use crate::shared::authorization::{can, Action, AuthContext, Resource};
use crate::user::entity::{is_valid_email, normalize_email, validate_department_for_role, NotificationPreferences};
use crate::usecase::{UnitOfWork, UseCaseError, UseCaseResult};
use crate::{details, try_use_case};
use crate::{DepartmentRepository, User, UserRepository};

/// Profile fields anyone may change on their own record; the rest are admin-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserCommand {
    #[serde(default)]
    pub name: Option<String>,
    /// Empty string clears the phone
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub notification_preferences: Option<NotificationPreferences>,

    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
    /// Empty string clears the department
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl UpdateUserCommand {
    fn touches_admin_fields(&self) -> bool {
        self.email.is_some()
            || self.password.is_some()
            || self.role.is_some()
            || self.department_id.is_some()
            || self.is_active.is_some()
    }
}

pub struct UpdateUserUseCase<U: UnitOfWork> {
    user_repo: Arc<UserRepository>,
    department_repo: Arc<DepartmentRepository>,
    password_service: Arc<PasswordService>,
    unit_of_work: Arc<U>,
}

impl<U: UnitOfWork> UpdateUserUseCase<U> {
    pub fn new(
        user_repo: Arc<UserRepository>,
        department_repo: Arc<DepartmentRepository>,
        password_service: Arc<PasswordService>,
        unit_of_work: Arc<U>,
    ) -> Self {
        Self {
            user_repo,
            department_repo,
            password_service,
            unit_of_work,
        }
    }

    pub async fn execute(&self, mut user: User, command: UpdateUserCommand, ctx: &AuthContext) -> UseCaseResult<User> {
        if command.touches_admin_fields() && !can(ctx, Action::Manage, &Resource::User(&user)) {
            return UseCaseResult::failure(UseCaseError::forbidden(
                "ADMIN_FIELDS",
                "Only an administrator may change email, password, role, department or activation",
            ));
        }

        if let Some(name) = &command.name {
            let name = name.trim();
            if name.is_empty() {
                return UseCaseResult::failure(UseCaseError::validation("NAME_REQUIRED", "Name cannot be empty"));
            }
            user.name = name.to_string();
        }

        if let Some(phone) = command.phone {
            user.phone = non_blank(Some(phone));
        }

        if let Some(preferences) = command.notification_preferences {
            user.notification_preferences = preferences;
        }

        if let Some(email) = &command.email {
            let email = normalize_email(email);
            if !is_valid_email(&email) {
                return UseCaseResult::failure(UseCaseError::validation_with_details(
                    "INVALID_EMAIL_FORMAT",
                    "Invalid email address format",
                    details! { "email" => &email },
                ));
            }
            if email != user.email {
                if try_use_case!(self.user_repo.exists_by_email(&email).await) {
                    return UseCaseResult::failure(UseCaseError::business_rule_with_details(
                        "EMAIL_EXISTS",
                        format!("A user with email '{}' already exists", email),
                        details! { "email" => &email },
                    ));
                }
                user.email = email;
            }
        }

        if let Some(password) = &command.password {
            user.password_hash = try_use_case!(self.password_service.hash_password(password));
        }

        if let Some(is_active) = command.is_active {
            if !is_active && user.id == ctx.user_id {
                return UseCaseResult::failure(UseCaseError::validation(
                    "CANNOT_DEACTIVATE_SELF",
                    "You cannot deactivate your own account",
                ));
            }
            user.is_active = is_active;
        }

        let role = command.role.unwrap_or(user.role);
        let department_id = match command.department_id {
            Some(id) => non_blank(Some(id)),
            None if role.forbids_department() => None,
            None => user.department_id.clone(),
        };

        if let Err(message) = validate_department_for_role(role, department_id.as_deref()) {
            return UseCaseResult::failure(UseCaseError::validation("INVALID_DEPARTMENT", message));
        }

        if department_id != user.department_id {
            if let Some(id) = &department_id {
                if try_use_case!(self.department_repo.find_by_id(id).await).is_none() {
                    return UseCaseResult::failure(UseCaseError::validation_with_details(
                        "DEPARTMENT_NOT_FOUND",
                        "Department does not exist",
                        details! { "departmentId" => id },
                    ));
                }
            }
        }

        user.role = role;
        user.department_id = department_id;
        user.touch();

        if let UseCaseResult::Failure(e) = self.unit_of_work.commit(&user, &[]).await {
            return UseCaseResult::failure(e);
        }

        info!(user_id = %user.id, updated_by = %ctx.user_id, "User updated");
        UseCaseResult::success(user)
    }
}
