//! Messaging transport abstraction.
//!
//! The dispatch engine only sees the [`Transport`] capability. Owning the
//! authenticated session (handshake, stored credentials, reconnects) is the
//! job of whatever sits behind an implementation:
//! - `GatewayTransport`: HTTP client for an external session gateway
//! - `NoopTransport`: logs and succeeds, used when no gateway is configured

pub mod gateway;
pub mod noop;

use async_trait::async_trait;
use thiserror::Error;

use crate::message::OutgoingMessage;
use crate::recipient::NormalizedAddress;

pub use gateway::GatewayTransport;
pub use noop::NoopTransport;

/// Failure of a single send or health check.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("transport rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Sends one message to one normalized address over a shared session.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver a message. Failures are per call and never retried here.
    async fn send(&self, to: &NormalizedAddress, message: &OutgoingMessage) -> Result<(), TransportError>;

    /// Report whether the underlying session is usable.
    async fn health_check(&self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Short name for logs.
    fn name(&self) -> &'static str;
}
