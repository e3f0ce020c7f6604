//! Dispatch engine - turns a job into paced, isolated delivery attempts.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{error, info};

use crate::attachment::{ResolutionError, ResolvedAttachment, Resolver};
use crate::job::Job;
use crate::message::OutgoingMessage;
use crate::recipient::normalize;
use crate::transport::Transport;

use super::outcome::{DeliveryOutcome, JobReport};

/// Closed interval the per-recipient pacing delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    min_ms: u64,
    max_ms: u64,
}

impl Pacing {
    /// Build from a (min, max) millisecond range; an inverted range is swapped.
    pub fn from_millis((min_ms, max_ms): (u64, u64)) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: min_ms.max(max_ms),
        }
    }

    /// Draw one delay uniformly from `[min, max]`.
    pub fn sample(&self) -> Duration {
        let ms = rand::thread_rng().gen_range(self.min_ms..=self.max_ms);
        Duration::from_millis(ms)
    }

    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

/// Delivers jobs through a shared transport.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    resolver: Resolver,
    pacing: Pacing,
    address_suffix: String,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        resolver: Resolver,
        pacing: Pacing,
        address_suffix: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            resolver,
            pacing,
            address_suffix: address_suffix.into(),
        }
    }

    /// Run a whole job.
    ///
    /// The attachment is resolved once up front; a resolution failure aborts
    /// the job before any recipient is contacted. After that, per-recipient
    /// failures are recorded and the loop carries on.
    pub async fn run(&self, job_id: u64, job: &Job) -> Result<JobReport, ResolutionError> {
        info!(
            job_id = job_id,
            recipients = job.recipients().len(),
            has_attachment = job.attachment().is_some(),
            transport = self.transport.name(),
            "dispatch_job_started"
        );

        let attachment = match job.attachment() {
            Some(descriptor) => match self.resolver.resolve(descriptor).await {
                Ok(resolved) => Some(resolved),
                Err(e) => {
                    error!(job_id = job_id, error = %e, "dispatch_job_aborted");
                    return Err(e);
                }
            },
            None => None,
        };

        Ok(self
            .deliver(job_id, job.recipients(), job.message(), attachment.as_ref())
            .await)
    }

    /// Send `text` (and the attachment, if any) to each recipient in order.
    ///
    /// Every recipient waits its own pacing delay before its send, and the
    /// next recipient starts only after the previous send returned.
    pub async fn deliver(
        &self,
        job_id: u64,
        recipients: &[String],
        text: &str,
        attachment: Option<&ResolvedAttachment>,
    ) -> JobReport {
        let message = OutgoingMessage::build(text, attachment);
        let mut report = JobReport::default();

        for raw in recipients {
            let to = normalize(raw, &self.address_suffix);
            let delay = self.pacing.sample();

            info!(
                job_id = job_id,
                recipient = %raw,
                delay_ms = delay.as_millis() as u64,
                "dispatch_pacing_delay"
            );
            sleep(delay).await;

            let outcome = match self.transport.send(&to, &message).await {
                Ok(()) => DeliveryOutcome::success(raw.as_str()),
                Err(e) => DeliveryOutcome::failure(raw.as_str(), e),
            };
            outcome.log(job_id, &message);
            report.record(outcome);
        }

        info!(
            job_id = job_id,
            total = report.outcomes.len(),
            sent = report.sent(),
            failed = report.failed(),
            "dispatch_job_complete"
        );

        report
    }
}
