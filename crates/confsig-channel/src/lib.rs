//! ---
//! confsig_section: "02-signaling-channel"
//! confsig_subsection: "module"
//! confsig_type: "source"
//! confsig_scope: "code"
//! confsig_description: "Reliable signaling channel and session management."
//! confsig_version: "v0.1.0"
//! confsig_owner: "tbd"
//! ---
//! Ordered, acknowledge-or-fail signaling channel for conference sessions.
//!
//! Every outgoing message gets a unique id and stays queued until the server
//! acknowledges it. While the connection is down messages accumulate; once the
//! session is resumed they are retransmitted in order. Each message completes
//! exactly once, either with the server's response or with a
//! [`SignalingError`].

mod channel;
mod emitter;
mod error;
mod observer;
mod operations;
mod session;
mod ticket;

pub use channel::{SignalingChannel, SignalingChannelBuilder};
pub use emitter::AckReceiver;
pub use error::{Result, SignalingError};
pub use observer::{ChannelObserver, ObserverHandle, ObserverRegistry};
pub use session::ConnectionState;
pub use ticket::ReconnectionTicket;
