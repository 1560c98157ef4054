//! Delete User Use Case

use std::sync::Arc;

use tracing::info;

use crate::shared::authorization::AuthContext;
use crate::usecase::{UnitOfWork, UseCaseError, UseCaseResult};
use crate::{details, try_use_case};
use crate::{ComplaintRepository, User};

pub struct DeleteUserUseCase<U: UnitOfWork> {
    complaint_repo: Arc<ComplaintRepository>,
    unit_of_work: Arc<U>,
}

impl<U: UnitOfWork> DeleteUserUseCase<U> {
    pub fn new(complaint_repo: Arc<ComplaintRepository>, unit_of_work: Arc<U>) -> Self {
        Self {
            complaint_repo,
            unit_of_work,
        }
    }

    pub async fn execute(&self, user: User, ctx: &AuthContext) -> UseCaseResult<String> {
        if user.id == ctx.user_id {
            return UseCaseResult::failure(UseCaseError::validation(
                "CANNOT_DELETE_SELF",
                "You cannot delete your own account",
            ));
        }

        let open = try_use_case!(self.complaint_repo.count_open_by_assignee(&user.id).await);
        if open > 0 {
            return UseCaseResult::failure(UseCaseError::business_rule_with_details(
                "USER_HAS_OPEN_COMPLAINTS",
                format!("User is the assignee of {} open complaint(s); reassign them first", open),
                details! { "userId" => &user.id, "openComplaints" => open },
            ));
        }

        if let UseCaseResult::Failure(e) = self.unit_of_work.commit_delete(&user).await {
            return UseCaseResult::failure(e);
        }

        info!(user_id = %user.id, deleted_by = %ctx.user_id, "User deleted");
        UseCaseResult::success(user.id)
    }
}
