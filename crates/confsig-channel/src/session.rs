//! ---
//! confsig_section: "02-signaling-channel"
//! confsig_subsection: "module"
//! confsig_type: "source"
//! confsig_scope: "code"
//! confsig_description: "Reliable signaling channel and session management."
//! confsig_version: "v0.1.0"
//! confsig_owner: "tbd"
//! ---
//! Connection lifecycle: reconnection accounting, session resumption and
//! reconnection ticket renewal.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use confsig_logging::{log_lifecycle_event, sig_debug, sig_warn, LifecycleOutcome, LogContext};
use confsig_msg::{events, Ack, AckHandler, AckPayload};
use serde_json::{json, Value as JsonValue};
use tokio::task::JoinHandle;

use crate::channel::{ChannelCore, ChannelState};
use crate::error::SignalingError;
use crate::ticket::ReconnectionTicket;

/// Connection state as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Default)]
pub(crate) struct SessionState {
    /// Credential used for the initial login.
    pub(crate) token: Option<String>,
    pub(crate) room_id: Option<String>,
    pub(crate) ticket: Option<ReconnectionTicket>,
    /// Reconnection attempts since the connection dropped.
    pub(crate) attempts: u32,
    /// Bumped for every resume request so late acks of an older one are
    /// recognised.
    pub(crate) resume_generation: u64,
    pub(crate) refresh_task: Option<JoinHandle<()>>,
}

impl SessionState {
    /// Forget everything tied to the current session.
    pub(crate) fn reset(&mut self) {
        if let Some(task) = self.refresh_task.take() {
            task.abort();
        }
        self.token = None;
        self.room_id = None;
        self.ticket = None;
        self.attempts = 0;
        self.resume_generation += 1;
    }
}

impl ChannelCore {
    pub(crate) fn handle_transport_disconnected(&self) {
        let mut state = self.state.lock();
        let current = state.connection;
        match current {
            ConnectionState::Connected => {
                state.connection = ConnectionState::Reconnecting;
                state.session.attempts = 0;
                state.session.resume_generation += 1;
                let pending = state.queue.len();
                drop(state);
                log_lifecycle_event(
                    Some(&LogContext::new().with_state("reconnecting")),
                    "session.interrupted",
                    &format!("connection dropped with {pending} message(s) pending"),
                    LifecycleOutcome::Degraded,
                );
            }
            ConnectionState::Reconnecting => {
                // A resume request in flight on the old connection is void.
                state.session.resume_generation += 1;
            }
            ConnectionState::Disconnected | ConnectionState::Connecting => {}
        }
    }

    pub(crate) fn handle_transport_reconnecting(&self) {
        let lost = {
            let mut state = self.state.lock();
            let current = state.connection;
            match current {
                ConnectionState::Connected | ConnectionState::Reconnecting => {
                    state.connection = ConnectionState::Reconnecting;
                    state.session.attempts += 1;
                    let attempt = state.session.attempts;
                    sig_debug!(
                        context = LogContext::new().with_state("reconnecting"),
                        "reconnection attempt {} of {}",
                        attempt,
                        self.reconnection.max_attempts
                    );
                    if attempt > self.reconnection.max_attempts {
                        self.lose_session_locked(&mut state);
                        true
                    } else {
                        false
                    }
                }
                ConnectionState::Disconnected | ConnectionState::Connecting => false,
            }
        };
        if lost {
            self.finish_session_lost("reconnection attempts exhausted");
        }
    }

    /// The transport is back. Resume the session before anything queued is
    /// retransmitted.
    pub(crate) fn handle_transport_connected(self: &Arc<Self>) {
        let lost = {
            let mut state = self.state.lock();
            if state.connection != ConnectionState::Reconnecting {
                return;
            }
            self.resume_locked(&mut state)
        };
        if lost {
            self.finish_session_lost("no credential to resume the session");
        }
    }

    /// Send `relogin` with the current ticket, or `login` with the original
    /// token when no ticket was issued. Returns `true` if the session cannot
    /// be resumed at all.
    fn resume_locked(self: &Arc<Self>, state: &mut ChannelState) -> bool {
        state.session.resume_generation += 1;
        let generation = state.session.resume_generation;

        let (event, payload) = if let Some(ticket) = &state.session.ticket {
            (events::RELOGIN, JsonValue::from(ticket.token.clone()))
        } else if let Some(token) = &state.session.token {
            (events::LOGIN, json!({ "token": token }))
        } else {
            self.lose_session_locked(state);
            return true;
        };

        let core = Arc::downgrade(self);
        let handler: AckHandler = Box::new(move |ack| {
            if let Some(core) = core.upgrade() {
                core.on_resume_ack(generation, ack);
            }
        });
        if self.transmit_unqueued(event, payload, handler) {
            sig_debug!(
                context = LogContext::new().with_event(event).with_state("reconnecting"),
                "resume requested"
            );
        }
        false
    }

    fn on_resume_ack(self: &Arc<Self>, generation: u64, ack: AckPayload) {
        let mut state = self.state.lock();
        if state.connection != ConnectionState::Reconnecting
            || state.session.resume_generation != generation
        {
            tracing::debug!(generation, "ignoring stale resume acknowledgment");
            return;
        }

        match Ack::from_payload(&ack) {
            Ok(Ack::Accepted(data)) => {
                state.connection = ConnectionState::Connected;
                state.session.attempts = 0;
                let drained = self.drain_queued_messages(&state);
                drop(state);

                log_lifecycle_event(
                    Some(&LogContext::new().with_state("connected")),
                    "session.resumed",
                    &format!("session resumed, {drained} queued message(s) drained"),
                    LifecycleOutcome::Success,
                );
                if let Some(JsonValue::String(token)) = data {
                    self.install_ticket(token);
                }
            }
            Ok(Ack::Rejected(reason)) | Err(reason) => {
                self.lose_session_locked(&mut state);
                drop(state);
                self.finish_session_lost(&format!("resume refused: {reason}"));
            }
        }
    }

    /// Mark the session lost and fail everything pending. Called with the
    /// state lock held; follow with [`ChannelCore::finish_session_lost`] once
    /// the lock is released.
    fn lose_session_locked(&self, state: &mut ChannelState) {
        state.connection = ConnectionState::Disconnected;
        state.session.reset();
        self.drop_queued_messages(state, SignalingError::SessionLost);
    }

    fn finish_session_lost(&self, reason: &str) {
        self.transport.close();
        log_lifecycle_event(
            Some(&LogContext::new().with_state("disconnected")),
            "session.lost",
            reason,
            LifecycleOutcome::Fault,
        );
        self.observers
            .notify(|observer| observer.on_server_disconnected());
    }

    /// Replace the reconnection ticket and reschedule its renewal.
    pub(crate) fn install_ticket(self: &Arc<Self>, token: String) {
        let ticket = ReconnectionTicket::new(token, Utc::now());
        {
            let mut state = self.state.lock();
            if state.connection == ConnectionState::Disconnected {
                tracing::debug!("ignoring reconnection ticket for a closed session");
                return;
            }
            if let Some(previous) = state.session.refresh_task.take() {
                previous.abort();
            }
            state.session.refresh_task = self.schedule_ticket_refresh(&ticket);
            state.session.ticket = Some(ticket.clone());
        }
        self.observers
            .notify(|observer| observer.on_reconnection_ticket(&ticket));
    }

    fn schedule_ticket_refresh(
        self: &Arc<Self>,
        ticket: &ReconnectionTicket,
    ) -> Option<JoinHandle<()>> {
        let runtime = self.runtime.as_ref()?;
        let delay = ticket.refresh_delay(
            Utc::now(),
            self.reconnection.ticket_refresh_margin,
            self.reconnection.ticket_refresh_interval,
        );
        tracing::debug!(delay_secs = delay.as_secs(), "reconnection ticket renewal scheduled");

        let core = Arc::downgrade(self);
        Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let renewal = match core.upgrade() {
                Some(channel) => {
                    channel.emit(events::REFRESH_RECONNECTION_TICKET, JsonValue::Null)
                }
                None => return,
            };
            match renewal.await {
                Ok(Some(JsonValue::String(token))) => {
                    if let Some(channel) = core.upgrade() {
                        channel.install_ticket(token);
                    }
                }
                Ok(_) => sig_warn!(
                    context = LogContext::new().with_event(events::REFRESH_RECONNECTION_TICKET),
                    "ticket renewal acknowledged without a ticket"
                ),
                Err(err) => sig_warn!(
                    context = LogContext::new().with_event(events::REFRESH_RECONNECTION_TICKET),
                    "reconnection ticket renewal failed: {}",
                    err
                ),
            }
        }))
    }
}
