//! Transport that only logs, for running without a session gateway.

use async_trait::async_trait;

use super::{Transport, TransportError};
use crate::message::OutgoingMessage;
use crate::recipient::NormalizedAddress;

#[derive(Debug, Clone, Default)]
pub struct NoopTransport;

#[async_trait]
impl Transport for NoopTransport {
    async fn send(&self, to: &NormalizedAddress, message: &OutgoingMessage) -> Result<(), TransportError> {
        tracing::info!(
            to = %to,
            kind = message.kind(),
            size_bytes = message.media().map(|m| m.bytes.len()).unwrap_or(0),
            "noop_transport_send_skipped"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
