//! Update Complaint Use Case

use std::sync::Arc;

use cd_common::ComplaintStatus;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::complaint::entity::Attachment;
use crate::complaint::notify::ComplaintNotifier;
use crate::shared::api_common::non_blank;
use crate::shared::authorization::{can, Action, AuthContext, Resource};
use crate::usecase::{UnitOfWork, UseCaseError, UseCaseResult};
use crate::{details, try_use_case};
use crate::{Complaint, ComplaintHistory, NatureTypeRepository};

/// Absent fields are left untouched; an empty string clears an optional field
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateComplaintCommand {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error_screen: Option<String>,
    #[serde(default)]
    pub nature_type_id: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default)]
    pub attachments: Option<Vec<Attachment>>,
    /// One of New, Assigned, In Progress, Completed, Done, Closed
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn set_optional(field: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value {
        *field = non_blank(Some(value));
    }
}

pub struct UpdateComplaintUseCase<U: UnitOfWork> {
    nature_type_repo: Arc<NatureTypeRepository>,
    unit_of_work: Arc<U>,
    notifier: ComplaintNotifier,
}

impl<U: UnitOfWork> UpdateComplaintUseCase<U> {
    pub fn new(nature_type_repo: Arc<NatureTypeRepository>, unit_of_work: Arc<U>, notifier: ComplaintNotifier) -> Self {
        Self {
            nature_type_repo,
            unit_of_work,
            notifier,
        }
    }

    pub async fn execute(
        &self,
        mut complaint: Complaint,
        command: UpdateComplaintCommand,
        ctx: &AuthContext,
    ) -> UseCaseResult<Complaint> {
        if !can(ctx, Action::Update, &Resource::Complaint(&complaint)) {
            return UseCaseResult::failure(UseCaseError::forbidden(
                "UPDATE_NOT_ALLOWED",
                "You may not edit this complaint",
            ));
        }

        let new_status = match non_blank(command.status) {
            Some(raw) => match raw.parse::<ComplaintStatus>() {
                Ok(status) => Some(status),
                Err(_) => {
                    return UseCaseResult::failure(UseCaseError::validation_with_details(
                        "INVALID_STATUS",
                        format!("Unknown status '{}'", raw),
                        details! { "status" => raw, "allowed" => ComplaintStatus::all().map(|s| s.as_str()) },
                    ))
                }
            },
            None => None,
        };
        if new_status.is_some_and(|s| s != complaint.status)
            && !can(ctx, Action::ChangeStatus, &Resource::Complaint(&complaint))
        {
            return UseCaseResult::failure(UseCaseError::forbidden(
                "STATUS_CHANGE_NOT_ALLOWED",
                "You may not change the status of this complaint",
            ));
        }

        if let Some(title) = command.title {
            let title = title.trim();
            if title.is_empty() {
                return UseCaseResult::failure(UseCaseError::validation("TITLE_REQUIRED", "Title cannot be empty"));
            }
            complaint.title = title.to_string();
        }
        if let Some(description) = command.description {
            let description = description.trim();
            if description.is_empty() {
                return UseCaseResult::failure(UseCaseError::validation(
                    "DESCRIPTION_REQUIRED",
                    "Description cannot be empty",
                ));
            }
            complaint.description = description.to_string();
        }

        if let Some(id) = non_blank(command.nature_type_id.clone()) {
            if complaint.nature_type_id.as_deref() != Some(id.as_str()) {
                let nature_type = try_use_case!(self.nature_type_repo.find_by_id(&id).await);
                if !nature_type.is_some_and(|n| n.is_active) {
                    return UseCaseResult::failure(UseCaseError::validation_with_details(
                        "INVALID_NATURE_TYPE",
                        "Nature type does not exist or is inactive",
                        details! { "natureTypeId" => id },
                    ));
                }
            }
        }

        set_optional(&mut complaint.error_type, command.error_type);
        set_optional(&mut complaint.error_screen, command.error_screen);
        set_optional(&mut complaint.nature_type_id, command.nature_type_id);
        set_optional(&mut complaint.remark, command.remark);
        if let Some(attachments) = command.attachments {
            complaint.attachments = attachments;
        }
        complaint.touch();

        let notes = non_blank(command.notes);
        let previous = new_status.and_then(|s| complaint.transition_to(s));
        let history: Vec<ComplaintHistory> = previous
            .map(|_| ComplaintHistory::status_change(&complaint, &ctx.user_id, notes.clone()))
            .into_iter()
            .collect();

        if let UseCaseResult::Failure(e) = self.unit_of_work.commit(&complaint, &history).await {
            return UseCaseResult::failure(e);
        }

        info!(complaint_id = %complaint.id, status_changed = previous.is_some(), "Complaint updated");
        if let Some(old_status) = previous {
            self.notifier.status_changed(&complaint, ctx, old_status, notes);
        }

        UseCaseResult::success(complaint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_support::{actor, offline_database};
    use crate::usecase::InMemoryUnitOfWork;
    use cd_common::{NotificationEvent, UserRole};
    use cd_notify::NotificationQueue;

    fn manager() -> AuthContext {
        actor("mgr", UserRole::Manager, Some("it"))
    }

    fn use_case(uow: Arc<InMemoryUnitOfWork>, notifier: ComplaintNotifier) -> UpdateComplaintUseCase<InMemoryUnitOfWork> {
        // nature type lookups are skipped when the command leaves the field alone
        let repo = Arc::new(NatureTypeRepository::new(&offline_database()));
        UpdateComplaintUseCase::new(repo, uow, notifier)
    }

    #[tokio::test]
    async fn test_unknown_status_rejected() {
        let uow = Arc::new(InMemoryUnitOfWork::new());
        let complaint = Complaint::new("t", "d", "client-1", "it", "mgr");
        let command = UpdateComplaintCommand {
            status: Some("Escalated".into()),
            ..Default::default()
        };

        let result = use_case(uow.clone(), ComplaintNotifier::disabled())
            .execute(complaint, command, &manager())
            .await;

        let err = result.into_result().unwrap_err();
        assert_eq!(err.code(), "INVALID_STATUS");
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(uow.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_edit_with_status_change_writes_history_and_notifies() {
        let uow = Arc::new(InMemoryUnitOfWork::new());
        let (queue, mut receiver) = NotificationQueue::bounded(4);
        let complaint = Complaint::new("t", "d", "client-1", "it", "mgr");
        let command = UpdateComplaintCommand {
            title: Some("  VPN drops hourly ".into()),
            remark: Some(String::new()),
            status: Some("In Progress".into()),
            notes: Some("looking".into()),
            ..Default::default()
        };

        let updated = use_case(uow.clone(), ComplaintNotifier::new(queue))
            .execute(complaint, command, &manager())
            .await
            .into_result()
            .unwrap();

        assert_eq!(updated.title, "VPN drops hourly");
        assert_eq!(updated.status, ComplaintStatus::InProgress);
        assert!(updated.remark.is_none());

        let rows = uow.history_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, ComplaintStatus::InProgress);
        assert_eq!(rows[0].notes.as_deref(), Some("looking"));

        let job = receiver.recv().await.unwrap();
        assert_eq!(job.event, NotificationEvent::StatusChanged);
        assert_eq!(job.details.old_status, Some(ComplaintStatus::New));
    }

    #[tokio::test]
    async fn test_same_status_is_plain_edit() {
        let uow = Arc::new(InMemoryUnitOfWork::new());
        let complaint = Complaint::new("t", "d", "client-1", "it", "mgr");
        let command = UpdateComplaintCommand {
            status: Some("New".into()),
            description: Some("more detail".into()),
            ..Default::default()
        };

        let updated = use_case(uow.clone(), ComplaintNotifier::disabled())
            .execute(complaint, command, &manager())
            .await
            .into_result()
            .unwrap();

        assert_eq!(updated.description, "more detail");
        assert_eq!(uow.commit_count(), 1);
        assert!(uow.history_rows().is_empty());
    }

    #[tokio::test]
    async fn test_client_cannot_edit_after_work_started() {
        let uow = Arc::new(InMemoryUnitOfWork::new());
        let mut complaint = Complaint::new("t", "d", "client-1", "it", "mgr");
        complaint.transition_to(ComplaintStatus::InProgress);
        let client = actor("client-1", UserRole::Client, None);

        let err = use_case(uow, ComplaintNotifier::disabled())
            .execute(complaint, UpdateComplaintCommand::default(), &client)
            .await
            .into_result()
            .unwrap_err();
        assert_eq!(err.http_status_code(), 403);
    }
}
