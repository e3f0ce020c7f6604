//! Outgoing message payloads handed to the transport.

use bytes::Bytes;

use crate::attachment::{AttachmentKind, ResolvedAttachment};

/// Attachment body plus the metadata the transport needs alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    /// Shared with the job's resolved attachment, never copied per recipient
    pub bytes: Bytes,
    pub mime_type: String,
    pub file_name: String,
    pub caption: String,
}

/// One message to one recipient. Each attachment kind has its own variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingMessage {
    Text { text: String },
    Image(MediaPayload),
    Video(MediaPayload),
    Document(MediaPayload),
}

impl OutgoingMessage {
    /// Build the message for a job's text and optional resolved attachment.
    ///
    /// With an attachment the text becomes its caption.
    pub fn build(text: &str, attachment: Option<&ResolvedAttachment>) -> Self {
        let Some(attachment) = attachment else {
            return OutgoingMessage::Text {
                text: text.to_string(),
            };
        };

        let payload = MediaPayload {
            bytes: attachment.bytes.clone(),
            mime_type: attachment.mime_type.clone(),
            file_name: attachment.file_name.clone(),
            caption: text.to_string(),
        };

        match attachment.kind {
            AttachmentKind::Image => OutgoingMessage::Image(payload),
            AttachmentKind::Video => OutgoingMessage::Video(payload),
            AttachmentKind::Document => OutgoingMessage::Document(payload),
        }
    }

    /// Wire name of the payload slot.
    pub fn kind(&self) -> &'static str {
        match self {
            OutgoingMessage::Text { .. } => "text",
            OutgoingMessage::Image(_) => "image",
            OutgoingMessage::Video(_) => "video",
            OutgoingMessage::Document(_) => "document",
        }
    }

    pub fn media(&self) -> Option<&MediaPayload> {
        match self {
            OutgoingMessage::Text { .. } => None,
            OutgoingMessage::Image(m) | OutgoingMessage::Video(m) | OutgoingMessage::Document(m) => {
                Some(m)
            }
        }
    }
}
