//! Complaint Operations

pub mod assign;
pub mod bulk;
pub mod change_status;
pub mod create;
pub mod delete;
pub mod update;

pub use assign::{AssignCommand, AssignComplaintUseCase};
pub use bulk::{BulkAction, BulkCommand, BulkComplaintUseCase, BulkFailure, BulkResult};
pub use change_status::{parse_status, ChangeStatusCommand, ChangeStatusUseCase};
pub use create::{CreateComplaintCommand, CreateComplaintUseCase};
pub use delete::DeleteComplaintUseCase;
pub use update::{UpdateComplaintCommand, UpdateComplaintUseCase};
