//! Comment Aggregate

pub mod api;
pub mod entity;
pub mod repository;

pub use api::CommentResponse;
pub use entity::{Comment, Reaction};
pub use repository::CommentRepository;
