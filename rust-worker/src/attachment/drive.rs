//! Drive share links - identifier extraction and direct download.

use reqwest::Client;

use super::remote::fetch_bytes;
use super::{ResolutionError, ResolvedAttachment};

/// Shortest character run accepted as a drive file identifier.
const MIN_FILE_ID_LEN: usize = 25;

/// Extension used when the content type has no subtype.
const FALLBACK_EXTENSION: &str = "file";

fn is_file_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Find the first run of at least 25 `[A-Za-z0-9_-]` characters in a URL.
///
/// The whole run is returned, not just its first 25 characters.
pub fn extract_drive_file_id(url: &str) -> Option<&str> {
    let mut start = None;

    for (i, c) in url.char_indices() {
        match (is_file_id_char(c), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                if i - s >= MIN_FILE_ID_LEN {
                    return Some(&url[s..i]);
                }
                start = None;
            }
            _ => {}
        }
    }

    start
        .filter(|&s| url.len() - s >= MIN_FILE_ID_LEN)
        .map(|s| &url[s..])
}

/// Build the direct-download URL for a drive file identifier.
pub fn drive_download_url(base: &str, file_id: &str) -> String {
    format!("{base}?export=download&id={file_id}")
}

/// Synthesize `drive_file_<id>.<ext>` with the extension taken from the MIME subtype.
pub fn drive_file_name(file_id: &str, mime_type: Option<&str>) -> String {
    let extension = mime_type
        .and_then(|m| m.split_once('/'))
        .map(|(_, subtype)| subtype.trim())
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_EXTENSION);

    format!("drive_file_{file_id}.{extension}")
}

/// Resolve a drive share link into an attachment.
pub async fn fetch_drive(
    client: &Client,
    download_base: &str,
    share_url: &str,
) -> Result<ResolvedAttachment, ResolutionError> {
    let file_id = match extract_drive_file_id(share_url) {
        Some(id) => id,
        None => {
            tracing::error!(url = share_url, "drive_file_id_not_found");
            return Err(ResolutionError::NoIdentifierFound {
                url: share_url.to_string(),
            });
        }
    };

    let download_url = drive_download_url(download_base, file_id);
    tracing::info!(file_id = file_id, download_url = %download_url, "drive_download_starting");

    let (bytes, mime_type) = fetch_bytes(client, &download_url).await?;
    let file_name = drive_file_name(file_id, mime_type.as_deref());

    Ok(ResolvedAttachment::new(bytes, mime_type, file_name))
}
