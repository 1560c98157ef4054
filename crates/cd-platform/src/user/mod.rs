//! User Aggregate

pub mod api;
pub mod entity;
pub mod operations;
pub mod repository;

pub use api::{users_router, UserResponse, UsersState};
pub use entity::{NotificationPreferences, User};
pub use repository::{UserFilter, UserRepository};
