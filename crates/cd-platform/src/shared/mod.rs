//! Shared Module
//!
//! Cross-cutting concerns and shared utilities.

pub mod error;
pub mod tsid;
pub mod middleware;
pub mod api_common;
pub mod authorization;
pub mod indexes;

// APIs
pub mod health_api;

#[cfg(test)]
pub mod test_support;

// Re-export commonly used items
pub use error::{PlatformError, Result};
pub use tsid::TsidGenerator;
pub use middleware::{AppState, AuthLayer, Authenticated};
pub use api_common::{PaginatedResponse, PaginationParams};
pub use authorization::{can, require, Action, AuthContext, Resource};
pub use health_api::{health_router, HealthState};
pub use indexes::initialize_indexes;
