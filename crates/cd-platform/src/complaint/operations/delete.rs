//! Delete Complaint Use Case

use std::sync::Arc;

use tracing::info;

use crate::shared::authorization::{can, Action, AuthContext, Resource};
use crate::usecase::{UnitOfWork, UseCaseError, UseCaseResult};
use crate::Complaint;

/// Removes the complaint with its history and comments
pub struct DeleteComplaintUseCase<U: UnitOfWork> {
    unit_of_work: Arc<U>,
}

impl<U: UnitOfWork> DeleteComplaintUseCase<U> {
    pub fn new(unit_of_work: Arc<U>) -> Self {
        Self { unit_of_work }
    }

    pub async fn execute(&self, complaint: &Complaint, ctx: &AuthContext) -> UseCaseResult<()> {
        if !can(ctx, Action::Delete, &Resource::Complaint(complaint)) {
            return UseCaseResult::failure(UseCaseError::forbidden(
                "DELETE_NOT_ALLOWED",
                "You may not delete this complaint",
            ));
        }

        if let UseCaseResult::Failure(e) = self.unit_of_work.commit_complaint_delete(&complaint.id).await {
            return UseCaseResult::failure(e);
        }

        info!(complaint_id = %complaint.id, deleted_by = %ctx.user_id, "Complaint deleted");
        UseCaseResult::success(())
    }
}
