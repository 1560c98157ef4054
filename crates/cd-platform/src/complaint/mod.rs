//! Complaint Aggregate

pub mod api;
pub mod entity;
pub mod notify;
pub mod operations;
pub mod repository;
pub mod routing;

pub use api::{complaints_router, ComplaintResponse, ComplaintsState, HistoryResponse};
pub use entity::{Attachment, Complaint};
pub use notify::ComplaintNotifier;
pub use repository::{ComplaintQuery, ComplaintRepository};
