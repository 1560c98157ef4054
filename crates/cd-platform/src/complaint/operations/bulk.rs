//! Bulk Complaint Actions
//!
//! Applies one action to many complaints. Each complaint goes through the
//! same use case as the single-item endpoint and succeeds or fails on its
//! own.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::complaint::notify::ComplaintNotifier;
use crate::complaint::operations::assign::{AssignCommand, AssignComplaintUseCase};
use crate::complaint::operations::change_status::{parse_status, ChangeStatusCommand, ChangeStatusUseCase};
use crate::complaint::operations::delete::DeleteComplaintUseCase;
use crate::shared::api_common::non_blank;
use crate::shared::authorization::{can, Action, AuthContext, Resource};
use crate::usecase::{UnitOfWork, UseCaseError, UseCaseResult};
use crate::{try_use_case, Complaint, ComplaintRepository, User, UserRepository};

/// Upper bound on ids per request
pub const MAX_BULK_IDS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    Status,
    Assign,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkCommand {
    pub ids: Vec<String>,
    pub action: BulkAction,
    /// Required for `status`
    #[serde(default)]
    pub status: Option<String>,
    /// Required for `assign`
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkFailure {
    pub id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkResult {
    pub succeeded: Vec<String>,
    pub failed: Vec<BulkFailure>,
}

impl BulkResult {
    fn record(&mut self, id: &str, outcome: Result<(), UseCaseError>) {
        match outcome {
            Ok(()) => self.succeeded.push(id.to_string()),
            Err(e) => self.failed.push(BulkFailure {
                id: id.to_string(),
                error: e.message().to_string(),
            }),
        }
    }
}

/// Validated form of a bulk request
enum Plan {
    Status(ChangeStatusCommand),
    Assign(AssignCommand),
    Delete,
}

pub struct BulkComplaintUseCase<U: UnitOfWork> {
    complaint_repo: Arc<ComplaintRepository>,
    user_repo: Arc<UserRepository>,
    unit_of_work: Arc<U>,
    notifier: ComplaintNotifier,
}

impl<U: UnitOfWork> BulkComplaintUseCase<U> {
    pub fn new(
        complaint_repo: Arc<ComplaintRepository>,
        user_repo: Arc<UserRepository>,
        unit_of_work: Arc<U>,
        notifier: ComplaintNotifier,
    ) -> Self {
        Self {
            complaint_repo,
            user_repo,
            unit_of_work,
            notifier,
        }
    }

    fn plan(command: BulkCommand, ctx: &AuthContext) -> Result<(Vec<String>, Plan), UseCaseError> {
        if !can(ctx, Action::Bulk, &Resource::Complaints) {
            return Err(UseCaseError::forbidden(
                "BULK_NOT_ALLOWED",
                "Bulk actions are limited to admins and managers",
            ));
        }

        let mut seen = HashSet::new();
        let ids: Vec<String> = command
            .ids
            .into_iter()
            .filter_map(|id| non_blank(Some(id)))
            .filter(|id| seen.insert(id.clone()))
            .collect();
        if ids.is_empty() {
            return Err(UseCaseError::validation("IDS_REQUIRED", "At least one complaint id is required"));
        }
        if ids.len() > MAX_BULK_IDS {
            return Err(UseCaseError::validation(
                "TOO_MANY_IDS",
                format!("At most {} complaints per bulk request", MAX_BULK_IDS),
            ));
        }

        let plan = match command.action {
            BulkAction::Status => {
                let Some(status) = non_blank(command.status) else {
                    return Err(UseCaseError::validation("STATUS_REQUIRED", "status is required"));
                };
                parse_status(&status)?;
                Plan::Status(ChangeStatusCommand {
                    status,
                    notes: command.notes,
                })
            }
            BulkAction::Assign => {
                let Some(assignee_id) = non_blank(command.assignee_id) else {
                    return Err(UseCaseError::validation("ASSIGNEE_REQUIRED", "assigneeId is required"));
                };
                Plan::Assign(AssignCommand {
                    assignee_id,
                    department_id: None,
                    notes: command.notes,
                })
            }
            BulkAction::Delete => Plan::Delete,
        };

        Ok((ids, plan))
    }

    pub async fn execute(&self, command: BulkCommand, ctx: &AuthContext) -> UseCaseResult<BulkResult> {
        let action = command.action;
        let (ids, plan) = try_use_case!(Self::plan(command, ctx));

        let assignee = match &plan {
            Plan::Assign(cmd) => match try_use_case!(self.user_repo.find_by_id(&cmd.assignee_id).await) {
                Some(user) => Some(user),
                None => {
                    return UseCaseResult::failure(UseCaseError::validation(
                        "INVALID_ASSIGNEE",
                        format!("User {} does not exist", cmd.assignee_id),
                    ))
                }
            },
            _ => None,
        };

        let complaints: HashMap<String, Complaint> = try_use_case!(self.complaint_repo.find_by_ids(&ids).await)
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        let names: HashMap<String, String> = match &plan {
            Plan::Assign(_) => {
                let assignee_ids: Vec<String> = complaints
                    .values()
                    .map(|c| c.current_assignee_id.clone())
                    .collect::<HashSet<_>>()
                    .into_iter()
                    .collect();
                try_use_case!(self.user_repo.find_by_ids(&assignee_ids).await)
                    .into_iter()
                    .map(|u| (u.id, u.name))
                    .collect()
            }
            _ => HashMap::new(),
        };

        let mut result = BulkResult::default();
        for id in &ids {
            let outcome = match complaints.get(id) {
                Some(complaint) if can(ctx, Action::Read, &Resource::Complaint(complaint)) => {
                    self.apply(complaint.clone(), &plan, assignee.as_ref(), &names, ctx)
                        .await
                }
                _ => Err(UseCaseError::not_found("COMPLAINT_NOT_FOUND", "Complaint not found")),
            };
            result.record(id, outcome);
        }

        info!(
            action = ?action,
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            "Bulk complaint action finished"
        );
        UseCaseResult::success(result)
    }

    async fn apply(
        &self,
        complaint: Complaint,
        plan: &Plan,
        assignee: Option<&User>,
        names: &HashMap<String, String>,
        ctx: &AuthContext,
    ) -> Result<(), UseCaseError> {
        match (plan, assignee) {
            (Plan::Status(cmd), _) => ChangeStatusUseCase::new(self.unit_of_work.clone(), self.notifier.clone())
                .execute(complaint, cmd.clone(), ctx)
                .await
                .into_result()
                .map(|_| ()),
            (Plan::Assign(cmd), Some(assignee)) => {
                let previous = names.get(&complaint.current_assignee_id).cloned();
                AssignComplaintUseCase::new(self.unit_of_work.clone(), self.notifier.clone())
                    .execute(complaint, assignee, previous, cmd.clone(), ctx)
                    .await
                    .into_result()
                    .map(|_| ())
            }
            (Plan::Assign(_), None) => Err(UseCaseError::validation("ASSIGNEE_REQUIRED", "assigneeId is required")),
            (Plan::Delete, _) => DeleteComplaintUseCase::new(self.unit_of_work.clone())
                .execute(&complaint, ctx)
                .await
                .into_result(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_support::actor;
    use crate::usecase::InMemoryUnitOfWork;
    use cd_common::UserRole;

    fn command(json: &str) -> BulkCommand {
        serde_json::from_str(json).unwrap()
    }

    fn plan_error(json: &str, ctx: &AuthContext) -> UseCaseError {
        match BulkComplaintUseCase::<InMemoryUnitOfWork>::plan(command(json), ctx) {
            Ok(_) => panic!("expected {json} to be rejected"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_result_shape() {
        let mut result = BulkResult::default();
        result.record("a", Ok(()));
        result.record("b", Err(UseCaseError::validation("STATUS_UNCHANGED", "Complaint is already Closed")));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "succeeded": ["a"],
                "failed": [{"id": "b", "error": "Complaint is already Closed"}]
            })
        );
    }

    #[test]
    fn test_plan_validation() {
        let admin = actor("admin", UserRole::Admin, None);

        let err = plan_error(r#"{"ids": ["a"], "action": "status"}"#, &admin);
        assert_eq!(err.code(), "STATUS_REQUIRED");

        let err = plan_error(r#"{"ids": ["a"], "action": "status", "status": "Archived"}"#, &admin);
        assert_eq!(err.code(), "INVALID_STATUS");

        let err = plan_error(r#"{"ids": ["a"], "action": "assign"}"#, &admin);
        assert_eq!(err.code(), "ASSIGNEE_REQUIRED");

        let err = plan_error(r#"{"ids": ["", " "], "action": "delete"}"#, &admin);
        assert_eq!(err.code(), "IDS_REQUIRED");

        let employee = actor("emp-1", UserRole::Employee, Some("it"));
        let err = plan_error(r#"{"ids": ["a"], "action": "delete"}"#, &employee);
        assert_eq!(err.http_status_code(), 403);
    }

    #[test]
    fn test_plan_dedups_ids() {
        let manager = actor("mgr", UserRole::Manager, Some("it"));
        let (ids, plan) = BulkComplaintUseCase::<InMemoryUnitOfWork>::plan(
            command(r#"{"ids": ["a", "b", "a"], "action": "status", "status": "Closed"}"#),
            &manager,
        )
        .unwrap();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(matches!(plan, Plan::Status(cmd) if cmd.status == "Closed"));
    }

    #[test]
    fn test_unknown_action_rejected_at_deserialization() {
        let parsed: Result<BulkCommand, _> = serde_json::from_str(r#"{"ids": ["a"], "action": "archive"}"#);
        assert!(parsed.is_err());
    }
}
