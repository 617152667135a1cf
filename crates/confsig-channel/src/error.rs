//! ---
//! confsig_section: "02-signaling-channel"
//! confsig_subsection: "module"
//! confsig_type: "source"
//! confsig_scope: "code"
//! confsig_description: "Reliable signaling channel and session management."
//! confsig_version: "v0.1.0"
//! confsig_owner: "tbd"
//! ---
use confsig_msg::TransportError;

/// Result type delivered to every signaling operation.
pub type Result<T> = std::result::Result<T, SignalingError>;

/// Ways a signaling operation can fail.
///
/// Duplicate or stale acknowledgments are not errors; they are dropped silently.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignalingError {
    /// The session could not be opened.
    #[error("connection error: {0}")]
    ConnectionError(String),
    /// The channel was closed before the message was acknowledged.
    #[error("signaling channel closed before acknowledgment")]
    ChannelClosed,
    /// Reconnection gave up and the session is gone.
    #[error("signaling session lost")]
    SessionLost,
    /// The request was refused locally before it reached the queue.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The acknowledgment did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// The server answered with a negative acknowledgment.
    #[error("rejected by server: {0}")]
    Rejected(String),
}

impl From<TransportError> for SignalingError {
    fn from(err: TransportError) -> Self {
        SignalingError::ConnectionError(err.to_string())
    }
}
