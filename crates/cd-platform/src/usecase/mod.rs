//! Use Case Infrastructure
//!
//! - `UseCaseResult<T>` - sealed result type for use case outcomes
//! - `UseCaseError` - categorized error types for consistent handling
//! - `UnitOfWork` - atomic commit of aggregate + history rows

pub mod error;
pub mod result;
pub mod unit_of_work;

pub use error::UseCaseError;
pub use result::UseCaseResult;
pub use unit_of_work::{HasId, MongoUnitOfWork, SerializableAggregate, UnitOfWork};

#[cfg(test)]
pub use unit_of_work::InMemoryUnitOfWork;
