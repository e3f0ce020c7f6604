//! Dispatch module - paced, per-recipient delivery of bulk jobs.
//!
//! ## Flow
//!
//! ```text
//! submit(job) → DispatchQueue → worker → Dispatcher::run()
//!                                          ├─ Resolver::resolve() (once)
//!                                          └─ per recipient: normalize → pacing delay → Transport::send
//! ```
//!
//! All jobs share one worker, so sends through the single transport session
//! never interleave across jobs.

pub mod engine;
pub mod outcome;
pub mod queue;

pub use engine::{Dispatcher, Pacing};
pub use outcome::{DeliveryOutcome, JobReport};
pub use queue::{DispatchQueue, DispatchWorker, JobTicket, QueueError};

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::time::Instant;

    use crate::message::OutgoingMessage;
    use crate::recipient::NormalizedAddress;
    use crate::transport::{Transport, TransportError};

    /// A send observed by [`RecordingTransport`].
    #[derive(Debug, Clone)]
    pub struct RecordedSend {
        pub to: String,
        pub message: OutgoingMessage,
        pub at: Instant,
    }

    /// Records every send and fails for a configured set of addresses.
    #[derive(Default)]
    pub struct RecordingTransport {
        failing: HashSet<String>,
        sends: Mutex<Vec<RecordedSend>>,
    }

    impl RecordingTransport {
        pub fn failing_for(addresses: &[&str]) -> Self {
            Self {
                failing: addresses.iter().map(|a| a.to_string()).collect(),
                sends: Mutex::new(Vec::new()),
            }
        }

        pub fn sends(&self) -> Vec<RecordedSend> {
            self.sends.lock().unwrap().clone()
        }

        pub fn recipients(&self) -> Vec<String> {
            self.sends().into_iter().map(|s| s.to).collect()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, to: &NormalizedAddress, message: &OutgoingMessage) -> Result<(), TransportError> {
            self.sends.lock().unwrap().push(RecordedSend {
                to: to.to_string(),
                message: message.clone(),
                at: Instant::now(),
            });

            if self.failing.contains(to.as_str()) {
                return Err(TransportError::Unavailable("simulated failure".to_string()));
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }
}
