//! Authentication
//!
//! Password login and session tokens.

pub mod auth_api;
pub mod auth_service;
pub mod password_service;

pub use auth_api::{auth_router, AuthState};
pub use auth_service::{AuthConfig, AuthService, SessionClaims};
pub use password_service::{Argon2Config, PasswordPolicy, PasswordService};
