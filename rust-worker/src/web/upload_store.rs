//! Temporary storage for files uploaded with a job submission.
//!
//! Uploads are written under the configured directory with a random name and
//! live until the attachment resolver reads and deletes them.

use std::path::{Path, PathBuf};

use axum::extract::multipart::{Field, MultipartError};
use rand::RngCore;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};

use crate::attachment::upload::discard_upload;
use crate::attachment::{AttachmentDescriptor, DEFAULT_MIME_TYPE};

/// A file written to disk from a multipart field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub path: PathBuf,
    pub mime_type: String,
    pub original_name: String,
    pub size_bytes: u64,
}

impl StoredUpload {
    pub fn into_descriptor(self) -> AttachmentDescriptor {
        AttachmentDescriptor::UploadedFile {
            path: self.path,
            declared_mime_type: self.mime_type,
            original_name: self.original_name,
        }
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read upload: {0}")]
    Multipart(#[from] MultipartError),
}

/// Random hex file name, like the names multipart stores usually pick.
fn random_file_name() -> String {
    let mut raw = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut raw);
    hex::encode(raw)
}

/// Stream a multipart file field into `dir`.
///
/// A partially written file is removed if the stream fails.
pub async fn store_upload(dir: &Path, mut field: Field<'_>) -> Result<StoredUpload, UploadError> {
    let original_name = field.file_name().unwrap_or("upload").to_string();
    let mime_type = field
        .content_type()
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string();

    fs::create_dir_all(dir).await?;
    let path = dir.join(random_file_name());
    let mut file = fs::File::create(&path).await?;

    let mut size_bytes = 0u64;
    let written = async {
        while let Some(chunk) = field.chunk().await? {
            size_bytes += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok::<(), UploadError>(())
    }
    .await;

    if let Err(e) = written {
        discard_upload(&path).await;
        return Err(e);
    }

    tracing::info!(
        path = %path.display(),
        original_name = %original_name,
        mime_type = %mime_type,
        size_bytes = size_bytes,
        "upload_stored"
    );

    Ok(StoredUpload {
        path,
        mime_type,
        original_name,
        size_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_file_name_is_hex() {
        let name = random_file_name();
        assert_eq!(name.len(), 32);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(name, random_file_name());
    }
}
