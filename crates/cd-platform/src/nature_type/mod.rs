//! Nature Type Aggregate

pub mod api;
pub mod entity;
pub mod repository;

pub use api::{nature_types_router, NatureTypeResponse, NatureTypesState};
pub use entity::NatureType;
pub use repository::NatureTypeRepository;
