//! Uploaded file attachments.

use std::io::ErrorKind;
use std::path::Path;

use bytes::Bytes;
use tokio::fs;

use super::{AttachmentDescriptor, ResolutionError, ResolvedAttachment};

/// Read an uploaded file into memory and delete it from disk.
///
/// The file is removed even when the read fails; a failed removal is only
/// logged.
pub async fn read_upload(
    path: &Path,
    declared_mime_type: &str,
    original_name: &str,
) -> Result<ResolvedAttachment, ResolutionError> {
    let read = fs::read(path).await;

    if let Err(e) = fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "upload_cleanup_failed");
    } else {
        tracing::debug!(path = %path.display(), "upload_cleanup_complete");
    }

    let data = read.map_err(|source| ResolutionError::Upload {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(ResolvedAttachment::new(
        Bytes::from(data),
        Some(declared_mime_type.to_string()),
        original_name.to_string(),
    ))
}

/// Remove an upload that will never reach the resolver.
pub async fn discard_upload(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "upload_discarded"),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "upload_already_removed")
        }
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "upload_discard_failed"),
    }
}

/// Remove the uploaded file behind a descriptor, if it has one.
pub async fn discard_descriptor(descriptor: Option<AttachmentDescriptor>) {
    if let Some(AttachmentDescriptor::UploadedFile { path, .. }) = descriptor {
        discard_upload(&path).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::AttachmentKind;

    #[tokio::test]
    async fn test_read_upload_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a1b2c3");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let resolved = read_upload(&path, "application/pdf", "invoice.pdf").await.unwrap();

        assert_eq!(&resolved.bytes[..], b"%PDF-1.7");
        assert_eq!(resolved.file_name, "invoice.pdf");
        assert_eq!(resolved.mime_type, "application/pdf");
        assert_eq!(resolved.kind, AttachmentKind::Document);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_read_upload_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone");

        let result = read_upload(&path, "image/png", "gone.png").await;
        assert!(matches!(result, Err(ResolutionError::Upload { .. })));
    }

    #[tokio::test]
    async fn test_discard_descriptor_removes_uploaded_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending");
        std::fs::write(&path, b"data").unwrap();

        discard_descriptor(Some(AttachmentDescriptor::UploadedFile {
            path: path.clone(),
            declared_mime_type: "text/plain".to_string(),
            original_name: "a.txt".to_string(),
        }))
        .await;

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_discard_descriptor_ignores_urls_and_missing_files() {
        discard_descriptor(Some(AttachmentDescriptor::from_url("https://example.com/a.png"))).await;
        discard_descriptor(None).await;
        discard_upload(Path::new("/nonexistent/bulkmsg-upload")).await;
    }
}
