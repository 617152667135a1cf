//! ---
//! confsig_section: "02-signaling-channel"
//! confsig_subsection: "module"
//! confsig_type: "source"
//! confsig_scope: "code"
//! confsig_description: "Reliable signaling channel and session management."
//! confsig_version: "v0.1.0"
//! confsig_owner: "tbd"
//! ---
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use confsig_logging::{sig_warn, LogContext};
use confsig_msg::{log_message, Ack, AckHandler, AckPayload, MessageDirection, PendingMessage};
use serde_json::Value as JsonValue;
use tokio::sync::oneshot;

use crate::channel::{ChannelCore, ChannelState};
use crate::error::{Result, SignalingError};
use crate::session::ConnectionState;

/// Resolves once the message is acknowledged or fails.
///
/// Dropping the receiver does not withdraw the message; it stays queued until
/// the server acknowledges it or the channel fails it.
#[derive(Debug)]
pub struct AckReceiver {
    id: u64,
    rx: oneshot::Receiver<Result<Option<JsonValue>>>,
}

impl AckReceiver {
    /// Identifier the message was assigned when it was enqueued.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Future for AckReceiver {
    type Output = Result<Option<JsonValue>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.get_mut().rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(SignalingError::ChannelClosed)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl ChannelCore {
    /// Enqueue a message and transmit it right away when connected.
    pub(crate) fn emit(self: &Arc<Self>, event: &str, payload: JsonValue) -> AckReceiver {
        let (tx, rx) = oneshot::channel();
        let mut state = self.state.lock();
        let connected = state.connection == ConnectionState::Connected;
        let wire = connected.then(|| payload.clone());
        let id = state.queue.push(event, payload, tx);

        self.counters.record_emitted();
        if let Some(exporter) = &self.exporter {
            exporter.observe_emitted();
        }

        match wire {
            Some(payload) => {
                if self.transmit(id, event, payload) {
                    log_message(MessageDirection::Outbound, id, event);
                }
            }
            None => tracing::debug!(
                message_id = id,
                event,
                state = %state.connection,
                "queued until the session is connected"
            ),
        }
        AckReceiver { id, rx }
    }

    /// Hand one queued message to the transport. The ack handler only holds a
    /// weak reference and correlates by id.
    ///
    /// Called with the state lock held.
    pub(crate) fn transmit(self: &Arc<Self>, id: u64, event: &str, payload: JsonValue) -> bool {
        let core = Arc::downgrade(self);
        let handler: AckHandler = Box::new(move |ack| {
            if let Some(core) = core.upgrade() {
                core.on_emit_ack(id, ack);
            }
        });
        match self.transport.emit(event, payload, handler) {
            Ok(()) => true,
            Err(err) => {
                sig_warn!(
                    context = LogContext::new().with_event(event).with_message_id(id),
                    "transmission failed, message stays queued: {}",
                    err
                );
                false
            }
        }
    }

    /// Send a frame that never enters the queue (login, relogin, logout).
    pub(crate) fn transmit_unqueued(
        &self,
        event: &str,
        payload: JsonValue,
        ack: AckHandler,
    ) -> bool {
        match self.transport.emit(event, payload, ack) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(event, error = %err, "control frame not sent");
                false
            }
        }
    }

    /// Complete the message `id`. Acks for messages no longer pending are
    /// ignored.
    pub(crate) fn on_emit_ack(&self, id: u64, ack: AckPayload) {
        let Some(message) = self.state.lock().queue.remove(id) else {
            tracing::debug!(message_id = id, "ignoring acknowledgment for a settled message");
            return;
        };
        let PendingMessage {
            event,
            responder,
            enqueued_at,
            ..
        } = message;

        let outcome = match Ack::from_payload(&ack) {
            Ok(Ack::Accepted(data)) => Ok(data),
            Ok(Ack::Rejected(reason)) => Err(SignalingError::Rejected(reason)),
            Err(description) => Err(SignalingError::InvalidResponse(description)),
        };

        match &outcome {
            Ok(_) => {
                log_message(MessageDirection::Acknowledged, id, &event);
                self.counters.record_acknowledged();
                if let Some(exporter) = &self.exporter {
                    exporter.observe_acknowledged(enqueued_at.elapsed());
                }
            }
            Err(err) => {
                tracing::warn!(message_id = id, event = %event, error = %err, "message failed");
                self.counters.record_failed(1);
                if let Some(exporter) = &self.exporter {
                    exporter.observe_failed(1);
                }
            }
        }
        let _ = responder.send(outcome);
    }

    /// Empty the queue, failing every message with `error`. Returns how many
    /// messages were dropped.
    pub(crate) fn drop_queued_messages(
        &self,
        state: &mut ChannelState,
        error: SignalingError,
    ) -> usize {
        let dropped = state.queue.take_all();
        let count = dropped.len();
        for message in dropped {
            log_message(MessageDirection::Dropped, message.id, &message.event);
            let _ = message.responder.send(Err(error.clone()));
        }
        if count > 0 {
            self.counters.record_failed(count as u64);
            if let Some(exporter) = &self.exporter {
                exporter.observe_failed(count as u64);
            }
        }
        count
    }

    /// Retransmit every queued message in FIFO order. Messages stay queued
    /// until acknowledged. Stops at the first transport failure.
    pub(crate) fn drain_queued_messages(self: &Arc<Self>, state: &ChannelState) -> usize {
        let frames: Vec<(u64, String, JsonValue)> = state
            .queue
            .iter()
            .map(|message| (message.id, message.event.clone(), message.payload.clone()))
            .collect();

        let mut drained = 0;
        for (id, event, payload) in frames {
            if !self.transmit(id, &event, payload) {
                break;
            }
            log_message(MessageDirection::Drained, id, &event);
            drained += 1;
        }

        if drained > 0 {
            self.counters.record_drained(drained as u64);
            if let Some(exporter) = &self.exporter {
                exporter.observe_drained(drained as u64);
            }
        }
        drained
    }
}
