//! Attachment resolution.
//!
//! A job's attachment may come from three places: a file uploaded with the
//! request, an arbitrary remote URL, or a drive share link. This module turns
//! any of them into one [`ResolvedAttachment`] that the dispatch engine reuses
//! for every recipient.
//!
//! ```text
//! AttachmentDescriptor → Resolver::resolve() → ResolvedAttachment
//! ```

pub mod drive;
pub mod remote;
pub mod upload;

use std::path::PathBuf;

use bytes::Bytes;
use reqwest::Client;
use thiserror::Error;
use tracing::info;

pub use drive::{drive_download_url, extract_drive_file_id};
pub use remote::file_name_from_url;

/// MIME type used when the source does not declare one.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Host fragment that marks a URL as a drive share link.
pub const DRIVE_HOST_MARKER: &str = "drive.google.com";

/// Where a job's attachment comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentDescriptor {
    /// File uploaded alongside the request and stored on local disk
    UploadedFile {
        path: PathBuf,
        declared_mime_type: String,
        original_name: String,
    },
    /// Any URL that can be fetched with a plain GET
    RemoteUrl { url: String },
    /// Drive share link that needs rewriting to a direct-download URL
    DriveUrl { url: String },
}

impl AttachmentDescriptor {
    /// Classify a submitted URL as a drive share link or a generic remote URL.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        if url.contains(DRIVE_HOST_MARKER) {
            AttachmentDescriptor::DriveUrl { url }
        } else {
            AttachmentDescriptor::RemoteUrl { url }
        }
    }

    fn source(&self) -> &'static str {
        match self {
            AttachmentDescriptor::UploadedFile { .. } => "upload",
            AttachmentDescriptor::RemoteUrl { .. } => "remote_url",
            AttachmentDescriptor::DriveUrl { .. } => "drive_url",
        }
    }
}

/// Which attachment slot the transport expects the payload in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Video,
    Document,
}

impl AttachmentKind {
    /// `image/*` is an image, `video/*` a video, everything else a document.
    pub fn from_mime(mime_type: &str) -> Self {
        let mime = mime_type.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            AttachmentKind::Image
        } else if mime.starts_with("video/") {
            AttachmentKind::Video
        } else {
            AttachmentKind::Document
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentKind::Image => "image",
            AttachmentKind::Video => "video",
            AttachmentKind::Document => "document",
        }
    }
}

/// Binary payload plus metadata, resolved once per job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAttachment {
    pub bytes: Bytes,
    pub mime_type: String,
    pub file_name: String,
    pub kind: AttachmentKind,
}

impl ResolvedAttachment {
    /// Build a resolved attachment, defaulting a missing MIME type and
    /// classifying the kind from it.
    pub fn new(bytes: Bytes, mime_type: Option<String>, file_name: String) -> Self {
        let mime_type = mime_type
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
        let kind = AttachmentKind::from_mime(&mime_type);

        Self {
            bytes,
            mime_type,
            file_name,
            kind,
        }
    }
}

/// Failure to turn a descriptor into a payload. Fatal for the whole job.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("failed to read uploaded file {path}: {source}")]
    Upload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no drive file identifier found in {url}")]
    NoIdentifierFound { url: String },

    #[error("invalid attachment url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("attachment download failed: {0}")]
    Network(#[from] reqwest::Error),
}

/// Resolves attachment descriptors using a shared HTTP client.
#[derive(Debug, Clone)]
pub struct Resolver {
    client: Client,
    drive_download_url: String,
}

impl Resolver {
    pub fn new(client: Client, drive_download_url: impl Into<String>) -> Self {
        Self {
            client,
            drive_download_url: drive_download_url.into(),
        }
    }

    /// Resolve a descriptor into a delivery-ready attachment.
    ///
    /// Uploaded files are removed from disk once read, whether or not the
    /// read succeeded.
    pub async fn resolve(
        &self,
        descriptor: &AttachmentDescriptor,
    ) -> Result<ResolvedAttachment, ResolutionError> {
        let source = descriptor.source();
        info!(source = source, "attachment_resolve_start");

        let resolved = match descriptor {
            AttachmentDescriptor::UploadedFile {
                path,
                declared_mime_type,
                original_name,
            } => upload::read_upload(path, declared_mime_type, original_name).await?,
            AttachmentDescriptor::RemoteUrl { url } => {
                remote::fetch_remote(&self.client, url).await?
            }
            AttachmentDescriptor::DriveUrl { url } => {
                drive::fetch_drive(&self.client, &self.drive_download_url, url).await?
            }
        };

        info!(
            source = source,
            file_name = %resolved.file_name,
            mime_type = %resolved.mime_type,
            kind = resolved.kind.as_str(),
            size_bytes = resolved.bytes.len(),
            "attachment_resolve_complete"
        );

        Ok(resolved)
    }
}
