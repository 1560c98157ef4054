//! Assign Complaint Use Case

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
use crate::{Complaint, ComplaintHistory, User};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignCommand {
    pub assignee_id: String,
    /// Must match the assignee's department when given
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

pub struct AssignComplaintUseCase<U: UnitOfWork> {
    unit_of_work: Arc<U>,
    notifier: ComplaintNotifier,
}

impl<U: UnitOfWork> AssignComplaintUseCase<U> {
    pub fn new(unit_of_work: Arc<U>, notifier: ComplaintNotifier) -> Self {
        Self { unit_of_work, notifier }
    }

    /// `assignee` is the user named by `command.assignee_id`; the caller
    /// loads it together with the previous assignee's display name.
    pub async fn execute(
        &self,
        mut complaint: Complaint,
        assignee: &User,
        previous_assignee_name: Option<String>,
        command: AssignCommand,
        ctx: &AuthContext,
    ) -> UseCaseResult<Complaint> {
        if !assignee.can_hold_complaints() {
            return UseCaseResult::failure(UseCaseError::validation_with_details(
                "INVALID_ASSIGNEE",
                "Assignee must be an active employee or manager",
                details! { "assigneeId" => &assignee.id, "role" => assignee.role.as_str() },
            ));
        }

        let Some(department_id) = assignee.department_id.clone() else {
            return UseCaseResult::failure(UseCaseError::validation_with_details(
                "ASSIGNEE_WITHOUT_DEPARTMENT",
                "Assignee does not belong to a department",
                details! { "assigneeId" => &assignee.id },
            ));
        };
        if let Some(requested) = non_blank(command.department_id) {
            if requested != department_id {
                return UseCaseResult::failure(UseCaseError::validation_with_details(
                    "DEPARTMENT_MISMATCH",
                    "Assignee does not belong to the requested department",
                    details! { "departmentId" => requested, "assigneeDepartmentId" => &department_id },
                ));
            }
        }

        if !can(ctx, Action::Assign, &Resource::Assignment { complaint: &complaint, assignee }) {
            return UseCaseResult::failure(UseCaseError::forbidden(
                "ASSIGN_NOT_ALLOWED",
                "You may only assign complaints within your own department",
            ));
        }

        let was_new = complaint.status == ComplaintStatus::New;
        let Some(previous_id) = complaint.reassign(&assignee.id, &department_id) else {
            return UseCaseResult::failure(UseCaseError::validation_with_details(
                "ALREADY_ASSIGNED",
                "Complaint is already assigned to this user",
                details! { "assigneeId" => &assignee.id },
            ));
        };

        let notes = non_blank(command.notes);
        let history = ComplaintHistory::assignment(&complaint, &previous_id, &ctx.user_id, notes.clone());
        if let UseCaseResult::Failure(e) = self
            .unit_of_work
            .commit(&complaint, std::slice::from_ref(&history))
            .await
        {
            return UseCaseResult::failure(e);
        }

        info!(
            complaint_id = %complaint.id,
            from = %previous_id,
            to = %assignee.id,
            department_id = %department_id,
            "Complaint assigned"
        );
        self.notifier.assigned(
            &complaint,
            ctx,
            was_new,
            previous_assignee_name,
            Some(assignee.name.clone()),
            notes,
        );

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

    fn user(id: &str, role: UserRole, department: &str) -> User {
        let mut user = User::new(format!("{}@desk.io", id), id, role, "hash").with_department(department);
        user.id = id.to_string();
        user
    }

    fn command(assignee: &User) -> AssignCommand {
        AssignCommand {
            assignee_id: assignee.id.clone(),
            department_id: None,
            notes: Some("handover".into()),
        }
    }

    #[tokio::test]
    async fn test_manager_assigns_new_complaint_within_department() {
        let uow = Arc::new(InMemoryUnitOfWork::new());
        let (queue, mut receiver) = NotificationQueue::bounded(4);
        let use_case = AssignComplaintUseCase::new(uow.clone(), ComplaintNotifier::new(queue));
        let manager = actor("mgr", UserRole::Manager, Some("it"));
        let employee = user("emp-1", UserRole::Employee, "it");
        let complaint = Complaint::new("t", "d", "client-1", "it", "mgr");

        let assigned = use_case
            .execute(complaint, &employee, Some("mgr".into()), command(&employee), &manager)
            .await
            .into_result()
            .unwrap();

        assert_eq!(assigned.current_assignee_id, "emp-1");
        assert_eq!(assigned.first_assignee_id, "mgr");
        assert_eq!(assigned.status, ComplaintStatus::Assigned);

        let rows = uow.history_rows();
        assert_eq!(rows[0].assigned_from.as_deref(), Some("mgr"));
        assert_eq!(rows[0].assigned_to.as_deref(), Some("emp-1"));

        let job = receiver.recv().await.unwrap();
        assert_eq!(job.event, NotificationEvent::Assigned);
        assert_eq!(job.details.new_assignee.as_deref(), Some("emp-1"));
    }

    #[tokio::test]
    async fn test_reassignment_after_work_started() {
        let uow = Arc::new(InMemoryUnitOfWork::new());
        let (queue, mut receiver) = NotificationQueue::bounded(4);
        let use_case = AssignComplaintUseCase::new(uow, ComplaintNotifier::new(queue));
        let admin = actor("admin", UserRole::Admin, None);
        let other = user("emp-9", UserRole::Employee, "hr");
        let mut complaint = Complaint::new("t", "d", "client-1", "it", "emp-1");
        complaint.transition_to(ComplaintStatus::InProgress);

        let assigned = use_case
            .execute(complaint, &other, None, command(&other), &admin)
            .await
            .into_result()
            .unwrap();

        assert_eq!(assigned.department_id, "hr");
        assert_eq!(assigned.status, ComplaintStatus::InProgress);
        assert_eq!(receiver.recv().await.unwrap().event, NotificationEvent::Reassigned);
    }

    #[tokio::test]
    async fn test_rejections() {
        let uow = Arc::new(InMemoryUnitOfWork::new());
        let use_case = AssignComplaintUseCase::new(uow.clone(), ComplaintNotifier::disabled());
        let manager = actor("mgr", UserRole::Manager, Some("it"));
        let complaint = || Complaint::new("t", "d", "client-1", "it", "emp-1");

        let client = user("client-2", UserRole::Client, "it");
        let err = use_case
            .execute(complaint(), &client, None, command(&client), &manager)
            .await
            .into_result()
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_ASSIGNEE");

        let stranger = user("emp-3", UserRole::Employee, "hr");
        let err = use_case
            .execute(complaint(), &stranger, None, command(&stranger), &manager)
            .await
            .into_result()
            .unwrap_err();
        assert_eq!(err.http_status_code(), 403);

        let current = user("emp-1", UserRole::Employee, "it");
        let err = use_case
            .execute(complaint(), &current, None, command(&current), &manager)
            .await
            .into_result()
            .unwrap_err();
        assert_eq!(err.code(), "ALREADY_ASSIGNED");

        let colleague = user("emp-2", UserRole::Employee, "it");
        let mut mismatched = command(&colleague);
        mismatched.department_id = Some("hr".into());
        let err = use_case
            .execute(complaint(), &colleague, None, mismatched, &manager)
            .await
            .into_result()
            .unwrap_err();
        assert_eq!(err.code(), "DEPARTMENT_MISMATCH");

        assert_eq!(uow.commit_count(), 0);
    }
}
