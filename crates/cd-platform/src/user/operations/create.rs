//! Create User Use Case

use std::sync::Arc;

use cd_common::UserRole;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use tracing::info;

use crate::auth::PasswordService;
use crate::shared::api_common::non_blank;
use crate::shared::authorization::AuthContext;
use crate::user::entity::{is_valid_email, normalize_email, validate_department_for_role};
use crate::usecase::{unit_of_work::HasId, UnitOfWork, UseCaseError, UseCaseResult};
use crate::{details, try_use_case};
use crate::{DepartmentRepository, User, UserRepository};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserCommand {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: UserRole,
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl HasId for User {
    fn id(&self) -> &str {
        &self.id
    }

    fn collection_name() -> &'static str {
        "users"
    }
}

pub struct CreateUserUseCase<U: UnitOfWork> {
    user_repo: Arc<UserRepository>,
    department_repo: Arc<DepartmentRepository>,
    password_service: Arc<PasswordService>,
    unit_of_work: Arc<U>,
}

impl<U: UnitOfWork> CreateUserUseCase<U> {
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

    pub async fn execute(&self, command: CreateUserCommand, ctx: &AuthContext) -> UseCaseResult<User> {
        let email = normalize_email(&command.email);
        if !is_valid_email(&email) {
            return UseCaseResult::failure(UseCaseError::validation_with_details(
                "INVALID_EMAIL_FORMAT",
                "Invalid email address format",
                details! { "email" => &command.email },
            ));
        }

        let name = command.name.trim();
        if name.is_empty() {
            return UseCaseResult::failure(UseCaseError::validation("NAME_REQUIRED", "Name is required"));
        }

        let department_id = non_blank(command.department_id);
        if let Err(message) = validate_department_for_role(command.role, department_id.as_deref()) {
            return UseCaseResult::failure(UseCaseError::validation("INVALID_DEPARTMENT", message));
        }

        if let Some(id) = &department_id {
            let department = try_use_case!(self.department_repo.find_by_id(id).await);
            if department.is_none() {
                return UseCaseResult::failure(UseCaseError::validation_with_details(
                    "DEPARTMENT_NOT_FOUND",
                    "Department does not exist",
                    details! { "departmentId" => id },
                ));
            }
        }

        if try_use_case!(self.user_repo.exists_by_email(&email).await) {
            return UseCaseResult::failure(UseCaseError::business_rule_with_details(
                "EMAIL_EXISTS",
                format!("A user with email '{}' already exists", email),
                details! { "email" => &email },
            ));
        }

        let password_hash = try_use_case!(self.password_service.hash_password(&command.password));

        let mut user = User::new(&email, name, command.role, password_hash);
        user.department_id = department_id;
        user.phone = non_blank(command.phone);

        if let UseCaseResult::Failure(e) = self.unit_of_work.commit(&user, &[]).await {
            return UseCaseResult::failure(e);
        }

        info!(user_id = %user.id, role = %user.role, created_by = %ctx.user_id, "User created");
        UseCaseResult::success(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_deserialization() {
        let json = r#"{"email":"a@desk.io","password":"welcome123","name":"A","role":"employee","departmentId":"0HZXEQ5Y8JY5Z"}"#;
        let cmd: CreateUserCommand = serde_json::from_str(json).unwrap();
        assert_eq!(cmd.role, UserRole::Employee);
        assert_eq!(cmd.department_id.as_deref(), Some("0HZXEQ5Y8JY5Z"));
        assert!(cmd.phone.is_none());
    }

    #[test]
    fn test_user_has_id() {
        let user = User::new("a@desk.io", "A", UserRole::Client, "hash");
        assert_eq!(HasId::id(&user), user.id);
        assert_eq!(<User as HasId>::collection_name(), "users");
    }
}
