//! Create Complaint Use Case

use std::sync::Arc;

use cd_common::UserRole;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::complaint::entity::Attachment;
use crate::complaint::notify::ComplaintNotifier;
use crate::complaint::routing::{choose_department, pick_assignee};
use crate::shared::api_common::non_blank;
use crate::shared::authorization::AuthContext;
use crate::usecase::{unit_of_work::HasId, UnitOfWork, UseCaseError, UseCaseResult};
use crate::{details, try_use_case};
use crate::{
    Complaint, ComplaintHistory, Department, DepartmentRepository, NatureTypeRepository, SettingsRepository, User,
    UserRepository,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateComplaintCommand {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error_screen: Option<String>,
    #[serde(default)]
    pub nature_type_id: Option<String>,
    /// Required when an admin or manager files on a client's behalf
    #[serde(default)]
    pub client_id: Option<String>,
    /// Admin/manager only; otherwise the complaint is routed
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub remark: Option<String>,
}

impl HasId for Complaint {
    fn id(&self) -> &str {
        &self.id
    }

    fn collection_name() -> &'static str {
        "complaints"
    }
}

pub struct CreateComplaintUseCase<U: UnitOfWork> {
    user_repo: Arc<UserRepository>,
    department_repo: Arc<DepartmentRepository>,
    nature_type_repo: Arc<NatureTypeRepository>,
    settings_repo: Arc<SettingsRepository>,
    unit_of_work: Arc<U>,
    notifier: ComplaintNotifier,
}

impl<U: UnitOfWork> CreateComplaintUseCase<U> {
    pub fn new(
        user_repo: Arc<UserRepository>,
        department_repo: Arc<DepartmentRepository>,
        nature_type_repo: Arc<NatureTypeRepository>,
        settings_repo: Arc<SettingsRepository>,
        unit_of_work: Arc<U>,
        notifier: ComplaintNotifier,
    ) -> Self {
        Self {
            user_repo,
            department_repo,
            nature_type_repo,
            settings_repo,
            unit_of_work,
            notifier,
        }
    }

    pub async fn execute(&self, command: CreateComplaintCommand, ctx: &AuthContext) -> UseCaseResult<Complaint> {
        let title = command.title.trim();
        if title.is_empty() {
            return UseCaseResult::failure(UseCaseError::validation("TITLE_REQUIRED", "Title is required"));
        }
        let description = command.description.trim();
        if description.is_empty() {
            return UseCaseResult::failure(UseCaseError::validation(
                "DESCRIPTION_REQUIRED",
                "Description is required",
            ));
        }

        let client_id = try_use_case!(self.resolve_client(command.client_id, ctx).await);

        let nature_type_id = non_blank(command.nature_type_id);
        if let Some(id) = &nature_type_id {
            let nature_type = try_use_case!(self.nature_type_repo.find_by_id(id).await);
            if !nature_type.is_some_and(|n| n.is_active) {
                return UseCaseResult::failure(UseCaseError::validation_with_details(
                    "INVALID_NATURE_TYPE",
                    "Nature type does not exist or is inactive",
                    details! { "natureTypeId" => id },
                ));
            }
        }

        let department = try_use_case!(self.resolve_department(non_blank(command.department_id), ctx).await);
        let assignee = try_use_case!(self.resolve_assignee(&department).await);

        let mut complaint = Complaint::new(title, description, client_id, &department.id, &assignee.id);
        complaint.error_type = non_blank(command.error_type);
        complaint.error_screen = non_blank(command.error_screen);
        complaint.nature_type_id = nature_type_id;
        complaint.attachments = command.attachments;
        complaint.remark = non_blank(command.remark);

        let history = ComplaintHistory::created(&complaint, &ctx.user_id);
        if let UseCaseResult::Failure(e) = self
            .unit_of_work
            .commit(&complaint, std::slice::from_ref(&history))
            .await
        {
            return UseCaseResult::failure(e);
        }

        info!(
            complaint_id = %complaint.id,
            department_id = %complaint.department_id,
            assignee_id = %complaint.current_assignee_id,
            "Complaint created"
        );
        self.notifier.created(&complaint, ctx, Some(assignee.name.clone()));

        UseCaseResult::success(complaint)
    }

    async fn resolve_client(&self, client_id: Option<String>, ctx: &AuthContext) -> Result<String, UseCaseError> {
        if ctx.is_client() {
            return Ok(ctx.user_id.clone());
        }

        let Some(client_id) = non_blank(client_id) else {
            return Err(UseCaseError::validation(
                "CLIENT_REQUIRED",
                "clientId is required when filing on a client's behalf",
            ));
        };

        let client = self.user_repo.find_by_id(&client_id).await?;
        match client {
            Some(c) if c.is_active && c.role == UserRole::Client => Ok(c.id),
            _ => Err(UseCaseError::validation_with_details(
                "INVALID_CLIENT",
                "clientId must reference an active client",
                details! { "clientId" => &client_id },
            )),
        }
    }

    async fn resolve_department(
        &self,
        requested: Option<String>,
        ctx: &AuthContext,
    ) -> Result<Department, UseCaseError> {
        if let Some(id) = requested.filter(|_| !ctx.is_client()) {
            return match self.department_repo.find_by_id(&id).await? {
                Some(d) if d.is_active => Ok(d),
                _ => Err(UseCaseError::validation_with_details(
                    "INVALID_DEPARTMENT",
                    "Department does not exist or is inactive",
                    details! { "departmentId" => &id },
                )),
            };
        }

        let settings = self.settings_repo.get().await?;
        let active = self.department_repo.find_all(true).await?;
        let mut rng = rand::thread_rng();
        choose_department(&settings, &active, &mut rng)
            .cloned()
            .ok_or_else(|| UseCaseError::validation("NO_DEPARTMENT", "No active department to route the complaint to"))
    }

    async fn resolve_assignee(&self, department: &Department) -> Result<User, UseCaseError> {
        let mut ids = Vec::new();
        ids.extend(department.manager_id.iter().cloned());
        ids.extend(department.default_assignee_id.iter().cloned());
        let users = self.user_repo.find_by_ids(&ids).await?;

        let find = |id: &Option<String>| {
            id.as_deref()
                .and_then(|id| users.iter().find(|u| u.id == id))
        };

        pick_assignee(find(&department.manager_id), find(&department.default_assignee_id))
            .cloned()
            .ok_or_else(|| {
                UseCaseError::validation_with_details(
                    "NO_ASSIGNEE",
                    format!("Department '{}' has no active manager or default assignee", department.name),
                    details! { "departmentId" => &department.id },
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_deserialization() {
        let json = r#"{
            "title": "Login fails",
            "description": "500 on submit",
            "errorType": "server",
            "attachments": [{"url": "/uploads/a.png", "filename": "a.png"}]
        }"#;
        let cmd: CreateComplaintCommand = serde_json::from_str(json).unwrap();
        assert_eq!(cmd.error_type.as_deref(), Some("server"));
        assert_eq!(cmd.attachments.len(), 1);
        assert_eq!(cmd.attachments[0].size, 0);
        assert!(cmd.department_id.is_none());
    }

    #[test]
    fn test_complaint_has_id() {
        let complaint = Complaint::new("t", "d", "c", "dep", "m");
        assert_eq!(HasId::id(&complaint), complaint.id);
        assert_eq!(<Complaint as HasId>::collection_name(), "complaints");
    }
}
