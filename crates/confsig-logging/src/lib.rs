//! ---
//! confsig_section: "03-logging"
//! confsig_subsection: "module"
//! confsig_type: "source"
//! confsig_scope: "code"
//! confsig_description: "Structured logging context for channel lifecycle events."
//! confsig_version: "v0.1.0"
//! confsig_owner: "tbd"
//! ---
#![warn(missing_docs)]

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

/// Initialize a baseline tracing subscriber suitable for development and tests.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer())
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Room the session belongs to, once known.
    pub room: Option<&'a str>,
    /// Signaling event name.
    pub event: Option<&'a str>,
    /// Outgoing message identifier.
    pub message_id: Option<u64>,
    /// Connection state descriptor.
    pub state: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a room identifier.
    pub fn with_room(mut self, room: &'a str) -> Self {
        self.room = Some(room);
        self
    }

    /// Attach a signaling event name.
    pub fn with_event(mut self, event: &'a str) -> Self {
        self.event = Some(event);
        self
    }

    /// Attach an outgoing message identifier.
    pub fn with_message_id(mut self, message_id: u64) -> Self {
        self.message_id = Some(message_id);
        self
    }

    /// Attach a connection state descriptor.
    pub fn with_state(mut self, state: &'a str) -> Self {
        self.state = Some(state);
        self
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// The transition completed normally.
    Success,
    /// The transition is recoverable but noteworthy.
    Degraded,
    /// The session or operation was lost.
    Fault,
}

impl LifecycleOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            LifecycleOutcome::Success => "success",
            LifecycleOutcome::Degraded => "degraded",
            LifecycleOutcome::Fault => "fault",
        }
    }
}

macro_rules! emit_lifecycle {
    ($level:expr, $ctx:expr, $event:expr, $message:expr, $outcome:expr) => {
        tracing::event!(
            $level,
            lifecycle = $event,
            outcome = $outcome.as_str(),
            room = $ctx.room.unwrap_or(""),
            signaling_event = $ctx.event.unwrap_or(""),
            message_id = $ctx.message_id.unwrap_or_default(),
            state = $ctx.state.unwrap_or(""),
            message = %$message
        )
    };
}

/// Emit a standardized lifecycle event with an outcome.
pub fn log_lifecycle_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: LifecycleOutcome,
) {
    let fallback = LogContext::default();
    let ctx = context.unwrap_or(&fallback);
    // `tracing::event!` needs a constant level.
    match outcome {
        LifecycleOutcome::Success => {
            emit_lifecycle!(Level::INFO, ctx, event, message, outcome)
        }
        LifecycleOutcome::Degraded => {
            emit_lifecycle!(Level::WARN, ctx, event, message, outcome)
        }
        LifecycleOutcome::Fault => {
            emit_lifecycle!(Level::ERROR, ctx, event, message, outcome)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_emit_without_panic() {
        init();
        let ctx = LogContext::new().with_room("room-a").with_message_id(7);
        sig_info!(context = ctx.clone(), "message queued");
        sig_debug!("debug message");
        sig_warn!(context = ctx, "retrying {}", "relogin");
    }

    #[test]
    fn lifecycle_helper_emits_every_outcome() {
        init();
        let ctx = LogContext::new().with_state("reconnecting");
        for outcome in [
            LifecycleOutcome::Success,
            LifecycleOutcome::Degraded,
            LifecycleOutcome::Fault,
        ] {
            log_lifecycle_event(Some(&ctx), "session.test", "lifecycle helper", outcome);
        }
        log_lifecycle_event(None, "session.test", "no context", LifecycleOutcome::Success);
    }
}
