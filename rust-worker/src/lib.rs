//! BulkMsg - paced bulk messaging over a shared transport session.
//!
//! This library provides the modules behind the `bulkmsg-server` binary:
//! - `web`: accepts jobs over HTTP and returns immediately
//! - `dispatch`: queues jobs and delivers them recipient by recipient
//! - `attachment`: resolves uploads, remote URLs and drive links into one payload
//! - `transport`: the capability used to actually send messages
//!
//! ## Architecture
//!
//! ```text
//! POST /send-message → DispatchQueue → Dispatcher → {Resolver, normalize} → Transport
//! ```

pub mod attachment;
pub mod config;
pub mod dispatch;
pub mod job;
pub mod message;
pub mod recipient;
pub mod transport;
pub mod web;

// Re-export commonly used types
pub use attachment::{AttachmentDescriptor, AttachmentKind, ResolutionError, ResolvedAttachment, Resolver};
pub use config::Config;
pub use dispatch::{
    DeliveryOutcome, DispatchQueue, DispatchWorker, Dispatcher, JobReport, JobTicket, Pacing,
};
pub use job::{Job, ValidationError};
pub use message::OutgoingMessage;
pub use recipient::{normalize, NormalizedAddress};
pub use transport::{GatewayTransport, NoopTransport, Transport, TransportError};
pub use web::AppState;
