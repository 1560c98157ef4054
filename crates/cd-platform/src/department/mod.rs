//! Department Aggregate

pub mod api;
pub mod entity;
pub mod repository;

pub use api::{departments_router, DepartmentResponse, DepartmentsState};
pub use entity::Department;
pub use repository::DepartmentRepository;
