//! Change Complaint Status Use Case

use std::sync::Arc;

use cd_common::ComplaintStatus;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::complaint::notify::ComplaintNotifier;
use crate::details;
use crate::shared::api_common::non_blank;
use crate::shared::authorization::{can, Action, AuthContext, Resource};
use crate::usecase::{UnitOfWork, UseCaseError, UseCaseResult};
use crate::{Complaint, ComplaintHistory};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStatusCommand {
    /// One of New, Assigned, In Progress, Completed, Done, Closed
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

pub fn parse_status(raw: &str) -> Result<ComplaintStatus, UseCaseError> {
    raw.parse::<ComplaintStatus>().map_err(|_| {
        UseCaseError::validation_with_details(
            "INVALID_STATUS",
            format!("Unknown status '{}'", raw),
            details! { "status" => raw, "allowed" => ComplaintStatus::all().map(|s| s.as_str()) },
        )
    })
}

pub struct ChangeStatusUseCase<U: UnitOfWork> {
    unit_of_work: Arc<U>,
    notifier: ComplaintNotifier,
}

impl<U: UnitOfWork> ChangeStatusUseCase<U> {
    pub fn new(unit_of_work: Arc<U>, notifier: ComplaintNotifier) -> Self {
        Self { unit_of_work, notifier }
    }

    pub async fn execute(
        &self,
        mut complaint: Complaint,
        command: ChangeStatusCommand,
        ctx: &AuthContext,
    ) -> UseCaseResult<Complaint> {
        let status = match parse_status(&command.status) {
            Ok(s) => s,
            Err(e) => return UseCaseResult::failure(e),
        };

        if !can(ctx, Action::ChangeStatus, &Resource::Complaint(&complaint)) {
            return UseCaseResult::failure(UseCaseError::forbidden(
                "STATUS_CHANGE_NOT_ALLOWED",
                "You may not change the status of this complaint",
            ));
        }

        let Some(previous) = complaint.transition_to(status) else {
            return UseCaseResult::failure(UseCaseError::validation_with_details(
                "STATUS_UNCHANGED",
                format!("Complaint is already {}", status),
                details! { "status" => status.as_str() },
            ));
        };

        let notes = non_blank(command.notes);
        let history = ComplaintHistory::status_change(&complaint, &ctx.user_id, notes.clone());
        if let UseCaseResult::Failure(e) = self
            .unit_of_work
            .commit(&complaint, std::slice::from_ref(&history))
            .await
        {
            return UseCaseResult::failure(e);
        }

        info!(
            complaint_id = %complaint.id,
            from = %previous,
            to = %status,
            "Complaint status changed"
        );
        self.notifier.status_changed(&complaint, ctx, previous, notes);

        UseCaseResult::success(complaint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_support::actor;
    use crate::usecase::InMemoryUnitOfWork;
    use cd_common::{NotificationEvent, UserRole};
    use cd_notify::NotificationQueue;

    fn command(status: &str) -> ChangeStatusCommand {
        ChangeStatusCommand {
            status: status.to_string(),
            notes: Some("checked logs".into()),
        }
    }

    #[test]
    fn test_parse_status_accepts_only_the_lifecycle_values() {
        for status in ComplaintStatus::all() {
            assert_eq!(parse_status(status.as_str()).unwrap(), status);
        }
        for bad in ["in progress", "Resolved", "", "CLOSED"] {
            assert_eq!(parse_status(bad).unwrap_err().http_status_code(), 400, "{bad}");
        }
    }

    #[tokio::test]
    async fn test_assignee_moves_complaint_forward() {
        let uow = Arc::new(InMemoryUnitOfWork::new());
        let (queue, mut receiver) = NotificationQueue::bounded(4);
        let use_case = ChangeStatusUseCase::new(uow.clone(), ComplaintNotifier::new(queue));
        let complaint = Complaint::new("t", "d", "client-1", "it", "emp-1");
        let employee = actor("emp-1", UserRole::Employee, Some("it"));

        let updated = use_case
            .execute(complaint, command("In Progress"), &employee)
            .await
            .into_result()
            .unwrap();

        assert_eq!(updated.status, ComplaintStatus::InProgress);
        let rows = uow.history_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].changed_by, "emp-1");
        assert_eq!(rows[0].notes.as_deref(), Some("checked logs"));

        let job = receiver.recv().await.unwrap();
        assert_eq!(job.event, NotificationEvent::StatusChanged);
        assert_eq!(job.actor.role, UserRole::Employee);
    }

    #[tokio::test]
    async fn test_unknown_and_unchanged_status_rejected() {
        let uow = Arc::new(InMemoryUnitOfWork::new());
        let use_case = ChangeStatusUseCase::new(uow.clone(), ComplaintNotifier::disabled());
        let admin = actor("admin", UserRole::Admin, None);

        let err = use_case
            .execute(Complaint::new("t", "d", "c", "it", "m"), command("Reopened"), &admin)
            .await
            .into_result()
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_STATUS");

        let err = use_case
            .execute(Complaint::new("t", "d", "c", "it", "m"), command("New"), &admin)
            .await
            .into_result()
            .unwrap_err();
        assert_eq!(err.code(), "STATUS_UNCHANGED");
        assert_eq!(uow.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_other_employee_forbidden() {
        let uow = Arc::new(InMemoryUnitOfWork::new());
        let use_case = ChangeStatusUseCase::new(uow, ComplaintNotifier::disabled());
        let outsider = actor("emp-2", UserRole::Employee, Some("it"));

        let err = use_case
            .execute(Complaint::new("t", "d", "c", "it", "emp-1"), command("Completed"), &outsider)
            .await
            .into_result()
            .unwrap_err();
        assert_eq!(err.http_status_code(), 403);
    }

    #[tokio::test]
    async fn test_commit_failure_publishes_nothing() {
        let uow = Arc::new(InMemoryUnitOfWork::failing("replica set unavailable"));
        let (queue, mut receiver) = NotificationQueue::bounded(4);
        let use_case = ChangeStatusUseCase::new(uow, ComplaintNotifier::new(queue));
        let admin = actor("admin", UserRole::Admin, None);

        let err = use_case
            .execute(Complaint::new("t", "d", "c", "it", "m"), command("Closed"), &admin)
            .await
            .into_result()
            .unwrap_err();

        assert_eq!(err.http_status_code(), 500);
        drop(use_case);
        assert!(receiver.recv().await.is_none());
    }
}
