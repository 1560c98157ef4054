//! User Operations

pub mod create;
pub mod delete;
pub mod update;

pub use create::{CreateUserCommand, CreateUserUseCase};
pub use delete::DeleteUserUseCase;
pub use update::{UpdateUserCommand, UpdateUserUseCase};
