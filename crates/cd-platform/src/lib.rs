//! ComplaintDesk Platform
//!
//! Core platform providing:
//! - Complaint intake with automatic department and assignee routing
//! - Status lifecycle and assignment with an append-only history
//! - Threaded comments with internal notes and reactions
//! - Users, departments, nature types and routing settings
//! - Role-based access control through a single `can` check
//! - WhatsApp notifications handed to a background worker
//!
//! ## Module Organization (Aggregate-based)
//!
//! Each aggregate contains:
//! - `entity` - Domain entities
//! - `repository` - Data access
//! - `api` - REST endpoints
//! - `operations` - Use case operations (where applicable)

// Aggregates
pub mod user;
pub mod department;
pub mod nature_type;
pub mod settings;
pub mod complaint;
pub mod complaint_history;
pub mod comment;

// Outer surfaces
pub mod auth;
pub mod upload;
pub mod messaging;

// Shared infrastructure
pub mod shared;

// Cross-cutting concerns
pub mod usecase;
pub mod seed;

// Re-export common types from shared
pub use shared::authorization::AuthContext;
pub use shared::error::{PlatformError, Result};
pub use shared::tsid::TsidGenerator;

// Re-export use case infrastructure
pub use usecase::{MongoUnitOfWork, UnitOfWork, UseCaseError, UseCaseResult};
// Note: details! and try_use_case! are exported at crate root via #[macro_export]

// Re-export main entity types for convenience
pub use user::entity::User;
pub use department::entity::Department;
pub use nature_type::entity::NatureType;
pub use settings::entity::SystemSettings;
pub use complaint::entity::Complaint;
pub use complaint_history::entity::ComplaintHistory;
pub use comment::entity::Comment;

// Re-export repositories
pub use user::repository::UserRepository;
pub use department::repository::DepartmentRepository;
pub use nature_type::repository::NatureTypeRepository;
pub use settings::repository::SettingsRepository;
pub use complaint::repository::ComplaintRepository;
pub use complaint_history::repository::ComplaintHistoryRepository;
pub use comment::repository::CommentRepository;

// Re-export services
pub use auth::auth_service::AuthService;
pub use auth::password_service::PasswordService;
