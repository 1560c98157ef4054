//! Upload API
//!
//! - POST /upload - Single multipart field `file`
//! - POST /upload/bulk - Repeated multipart field `files`

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::complaint::entity::Attachment;
use crate::shared::authorization::{require, Action, Resource};
use crate::shared::error::PlatformError;
use crate::shared::middleware::Authenticated;
use crate::upload::storage::UploadStorage;

/// Room for multipart boundaries and headers on top of the file bytes
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct UploadState {
    pub storage: Arc<UploadStorage>,
}

struct ReceivedFile {
    name: String,
    content_type: String,
    data: Vec<u8>,
}

/// Collect the parts named `field`; other parts are ignored
async fn read_files(
    multipart: &mut Multipart,
    field: &str,
    storage: &UploadStorage,
) -> Result<Vec<ReceivedFile>, PlatformError> {
    let mut files = Vec::new();

    while let Some(part) = multipart
        .next_field()
        .await
        .map_err(|e| PlatformError::validation(format!("Malformed multipart body: {}", e)))?
    {
        if part.name() != Some(field) {
            continue;
        }
        if files.len() == storage.max_files() {
            storage.check_count(files.len() + 1)?;
        }

        let name = part.file_name().unwrap_or("file").to_string();
        let content_type = part.content_type().unwrap_or_default().to_string();
        let data = part
            .bytes()
            .await
            .map_err(|e| PlatformError::validation(format!("Could not read '{}': {}", name, e)))?;

        files.push(ReceivedFile {
            name,
            content_type,
            data: data.to_vec(),
        });
    }

    storage.check_count(files.len())?;
    Ok(files)
}

/// Upload one file
#[utoipa::path(
    post,
    path = "",
    tag = "uploads",
    operation_id = "postApiUpload",
    request_body(content_type = "multipart/form-data", description = "Multipart field `file`"),
    responses(
        (status = 201, description = "File stored", body = Attachment),
        (status = 400, description = "Missing, empty or oversized file")
    )
)]
pub async fn upload_file(
    State(state): State<UploadState>,
    auth: Authenticated,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Attachment>), PlatformError> {
    require(&auth, Action::Create, &Resource::Upload)?;

    let mut files = read_files(&mut multipart, "file", &state.storage).await?;
    if files.len() > 1 {
        return Err(PlatformError::validation("Use /upload/bulk for more than one file"));
    }
    let Some(file) = files.pop() else {
        return Err(PlatformError::validation("No file uploaded"));
    };

    let attachment = state.storage.store(&file.name, &file.content_type, &file.data).await?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

/// Upload several files
#[utoipa::path(
    post,
    path = "/bulk",
    tag = "uploads",
    operation_id = "postApiUploadBulk",
    request_body(content_type = "multipart/form-data", description = "Repeated multipart field `files`"),
    responses(
        (status = 201, description = "Files stored", body = Vec<Attachment>),
        (status = 400, description = "No files, too many files, or an oversized file")
    )
)]
pub async fn upload_files(
    State(state): State<UploadState>,
    auth: Authenticated,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<Attachment>>), PlatformError> {
    require(&auth, Action::Create, &Resource::Upload)?;

    let files = read_files(&mut multipart, "files", &state.storage).await?;

    let mut attachments = Vec::with_capacity(files.len());
    for file in &files {
        attachments.push(state.storage.store(&file.name, &file.content_type, &file.data).await?);
    }
    Ok((StatusCode::CREATED, Json(attachments)))
}

pub fn upload_router(state: UploadState) -> OpenApiRouter {
    let body_limit = state
        .storage
        .max_file_bytes()
        .saturating_mul(state.storage.max_files())
        .saturating_add(MULTIPART_OVERHEAD);

    OpenApiRouter::new()
        .routes(routes!(upload_file))
        .routes(routes!(upload_files))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
