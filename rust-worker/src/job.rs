//! Bulk messaging job definition.

use thiserror::Error;

use crate::attachment::AttachmentDescriptor;

/// Reason a submitted job was rejected before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Recipients and message are required")]
    MissingRecipients,

    #[error("Recipients and message are required")]
    MissingMessage,
}

/// One bulk-messaging request: many recipients, one text, one optional attachment.
///
/// Fields are private so an accepted job cannot change after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    recipients: Vec<String>,
    message: String,
    attachment: Option<AttachmentDescriptor>,
}

impl Job {
    /// Validate and build a job.
    ///
    /// Blank recipient entries are dropped; a job needs at least one
    /// recipient and a non-empty message.
    pub fn new(
        recipients: Vec<String>,
        message: String,
        attachment: Option<AttachmentDescriptor>,
    ) -> Result<Self, ValidationError> {
        let recipients: Vec<String> = recipients
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();

        if recipients.is_empty() {
            return Err(ValidationError::MissingRecipients);
        }
        if message.trim().is_empty() {
            return Err(ValidationError::MissingMessage);
        }

        Ok(Self {
            recipients,
            message,
            attachment,
        })
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn attachment(&self) -> Option<&AttachmentDescriptor> {
        self.attachment.as_ref()
    }

    /// Take ownership of the attachment, e.g. to clean up a rejected upload.
    pub fn into_attachment(self) -> Option<AttachmentDescriptor> {
        self.attachment
    }
}
