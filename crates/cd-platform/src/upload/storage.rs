//! Attachment Storage
//!
//! Files land in a local directory under a TSID name; the original
//! extension survives when it is plain alphanumeric.

use std::path::{Path, PathBuf};

use cd_config::UploadSettings;
use tracing::debug;

use crate::complaint::entity::Attachment;
use crate::shared::error::{PlatformError, Result};
use crate::TsidGenerator;

const MAX_EXTENSION_LEN: usize = 10;

#[derive(Debug, Clone)]
pub struct UploadStorage {
    dir: PathBuf,
    public_path: String,
    max_file_bytes: usize,
    max_files: usize,
}

impl UploadStorage {
    pub fn new(settings: &UploadSettings) -> Self {
        Self {
            dir: PathBuf::from(&settings.dir),
            public_path: settings.public_path.trim_end_matches('/').to_string(),
            max_file_bytes: settings.max_file_bytes,
            max_files: settings.max_files,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_file_bytes(&self) -> usize {
        self.max_file_bytes
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    /// Reject a request carrying more files than allowed
    pub fn check_count(&self, count: usize) -> Result<()> {
        if count == 0 {
            return Err(PlatformError::validation("No file uploaded"));
        }
        if count > self.max_files {
            return Err(PlatformError::validation(format!(
                "At most {} files per upload",
                self.max_files
            )));
        }
        Ok(())
    }

    /// Write one file and describe it as an attachment
    pub async fn store(&self, original_name: &str, content_type: &str, data: &[u8]) -> Result<Attachment> {
        if data.is_empty() {
            return Err(PlatformError::validation(format!("File '{}' is empty", original_name)));
        }
        if data.len() > self.max_file_bytes {
            return Err(PlatformError::validation(format!(
                "File '{}' exceeds the {} byte limit",
                original_name, self.max_file_bytes
            )));
        }

        let stored_name = match sanitize_extension(original_name) {
            Some(ext) => format!("{}.{}", TsidGenerator::generate(), ext),
            None => TsidGenerator::generate(),
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PlatformError::internal(format!("Cannot create upload directory: {}", e)))?;
        tokio::fs::write(self.dir.join(&stored_name), data)
            .await
            .map_err(|e| PlatformError::internal(format!("Cannot store upload: {}", e)))?;

        debug!(file = %stored_name, size = data.len(), "Stored upload");

        Ok(Attachment {
            url: format!("{}/{}", self.public_path, stored_name),
            filename: display_name(original_name),
            content_type: if content_type.is_empty() {
                "application/octet-stream".to_string()
            } else {
                content_type.to_string()
            },
            size: data.len() as u64,
        })
    }
}

/// Lower-cased extension when it is short and alphanumeric
pub fn sanitize_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > MAX_EXTENSION_LEN {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Client-supplied name without any directory part
fn display_name(original: &str) -> String {
    let name = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() {
        "file".to_string()
    } else {
        name.to_string()
    }
}
