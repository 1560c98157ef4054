//! Attachment Uploads

pub mod api;
pub mod storage;

pub use api::{upload_router, UploadState};
pub use storage::UploadStorage;
