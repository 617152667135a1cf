//! ---
//! confsig_section: "02-signaling-messages"
//! confsig_subsection: "module"
//! confsig_type: "source"
//! confsig_scope: "code"
//! confsig_description: "Signaling wire types, transport boundary, and outgoing queue."
//! confsig_version: "v0.1.0"
//! confsig_owner: "tbd"
//! ---
//! Message-level primitives for the conference signaling channel.
#![warn(missing_docs)]

pub mod logging;
pub mod metrics;
pub mod queue;
pub mod transport;
pub mod types;

/// Shared result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Failures reported by a transport at the channel boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The transport has no open connection to emit on.
    #[error("transport is not connected")]
    NotConnected,
    /// Opening the connection failed (bad credential, unreachable server).
    #[error("failed to open connection: {0}")]
    Open(String),
    /// The transport refused to emit an event.
    #[error("emit failed: {0}")]
    Emit(String),
}

pub use logging::{log_message, MessageDirection, SignalingMetricsExporter};
pub use metrics::{ChannelMetrics, Counters};
pub use queue::{OutgoingQueue, PendingMessage};
pub use transport::{
    AckHandler, EmittedFrame, InMemoryTransport, SignalingTransport, TransportListener,
};
pub use types::{events, Ack, AckPayload, RoomInfo};
