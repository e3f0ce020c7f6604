//! Remote URL attachments - plain GET downloads.

use bytes::Bytes;
use reqwest::{header::CONTENT_TYPE, Client};
use url::Url;

use super::{ResolutionError, ResolvedAttachment};

/// Name used when a URL has no usable final path segment.
const FALLBACK_FILE_NAME: &str = "attachment";

/// Download a URL and return its body with the declared content type.
///
/// The content type is reduced to its essence (`type/subtype`), dropping
/// parameters such as `charset`. Non-2xx responses are treated as failures.
pub async fn fetch_bytes(
    client: &Client,
    url: &str,
) -> Result<(Bytes, Option<String>), ResolutionError> {
    tracing::info!(url = url, "attachment_fetch_starting");

    let response = match client.get(url).send().await.and_then(|r| r.error_for_status()) {
        Ok(resp) => resp,
        Err(e) => {
            tracing::error!(url = url, error = %e, "attachment_fetch_failed");
            return Err(ResolutionError::Network(e));
        }
    };

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(mime_essence)
        .filter(|m| !m.is_empty());

    let body = response.bytes().await?;

    tracing::info!(
        url = url,
        status_code = status,
        content_type = ?content_type,
        size_bytes = body.len(),
        "attachment_fetch_complete"
    );

    Ok((body, content_type))
}

/// Resolve a generic remote URL attachment.
pub async fn fetch_remote(client: &Client, url: &str) -> Result<ResolvedAttachment, ResolutionError> {
    let parsed = Url::parse(url).map_err(|source| ResolutionError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;

    let (bytes, mime_type) = fetch_bytes(client, parsed.as_str()).await?;
    Ok(ResolvedAttachment::new(bytes, mime_type, file_name_from_url(&parsed)))
}

/// Derive a file name from the final non-empty path segment of a URL.
pub fn file_name_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|s| s.to_string())
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}

fn mime_essence(header: &str) -> String {
    header.split(';').next().unwrap_or("").trim().to_string()
}
