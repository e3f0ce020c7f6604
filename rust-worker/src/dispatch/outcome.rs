//! Per-recipient delivery outcomes.

use tracing::{error, info};

use crate::message::OutgoingMessage;

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub recipient: String,
    pub succeeded: bool,
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn success(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            succeeded: true,
            error: None,
        }
    }

    pub fn failure(recipient: impl Into<String>, error: impl ToString) -> Self {
        Self {
            recipient: recipient.into(),
            succeeded: false,
            error: Some(error.to_string()),
        }
    }

    /// Emit the outcome as a structured log event.
    pub fn log(&self, job_id: u64, message: &OutgoingMessage) {
        match (self.succeeded, message) {
            (true, OutgoingMessage::Text { .. }) => {
                info!(job_id = job_id, recipient = %self.recipient, "dispatch_text_sent");
            }
            (true, _) => {
                info!(
                    job_id = job_id,
                    recipient = %self.recipient,
                    kind = message.kind(),
                    "dispatch_media_sent"
                );
            }
            (false, _) => {
                error!(
                    job_id = job_id,
                    recipient = %self.recipient,
                    kind = message.kind(),
                    error = self.error.as_deref().unwrap_or("unknown"),
                    "dispatch_send_failed"
                );
            }
        }
    }
}

/// Outcomes of one job, in recipient order. Only ever logged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport {
    pub outcomes: Vec<DeliveryOutcome>,
}

impl JobReport {
    pub fn record(&mut self, outcome: DeliveryOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn sent(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.sent()
    }
}
