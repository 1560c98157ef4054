//! Complaint History

pub mod entity;
pub mod repository;

pub use entity::ComplaintHistory;
pub use repository::ComplaintHistoryRepository;
