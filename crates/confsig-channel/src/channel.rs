//! ---
//! confsig_section: "02-signaling-channel"
//! confsig_subsection: "module"
//! confsig_type: "source"
//! confsig_scope: "code"
//! confsig_description: "Reliable signaling channel and session management."
//! confsig_version: "v0.1.0"
//! confsig_owner: "tbd"
//! ---
use std::sync::{Arc, Weak};

use confsig_common::ReconnectionConfig;
use confsig_logging::{log_lifecycle_event, sig_info, LifecycleOutcome, LogContext};
use confsig_msg::{
    events, ChannelMetrics, Counters, OutgoingQueue, RoomInfo, SignalingMetricsExporter,
    SignalingTransport, TransportListener,
};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::emitter::AckReceiver;
use crate::error::{Result, SignalingError};
use crate::observer::{ChannelObserver, ObserverHandle, ObserverRegistry};
use crate::session::{ConnectionState, SessionState};
use crate::ticket::ReconnectionTicket;

/// Completion handle stored with each pending message.
pub(crate) type Responder = oneshot::Sender<Result<Option<JsonValue>>>;

/// Everything guarded by the channel lock.
pub(crate) struct ChannelState {
    pub(crate) connection: ConnectionState,
    pub(crate) queue: OutgoingQueue<Responder>,
    pub(crate) session: SessionState,
}

/// Shared core of a [`SignalingChannel`]. Transport callbacks and the ticket
/// renewal task only hold `Weak` references to it.
pub(crate) struct ChannelCore {
    pub(crate) transport: Arc<dyn SignalingTransport>,
    pub(crate) reconnection: ReconnectionConfig,
    pub(crate) state: Mutex<ChannelState>,
    pub(crate) observers: ObserverRegistry,
    pub(crate) counters: Counters,
    pub(crate) exporter: Option<Arc<SignalingMetricsExporter>>,
    pub(crate) runtime: Option<Handle>,
}

impl Drop for ChannelCore {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        let was_open = state.connection != ConnectionState::Disconnected;
        state.connection = ConnectionState::Disconnected;
        state.session.reset();
        self.drop_queued_messages(&mut state, SignalingError::ChannelClosed);
        drop(state);
        if was_open {
            self.transport.close();
        }
    }
}

/// Builder for [`SignalingChannel`].
pub struct SignalingChannelBuilder {
    transport: Arc<dyn SignalingTransport>,
    reconnection: ReconnectionConfig,
    exporter: Option<Arc<SignalingMetricsExporter>>,
    runtime: Option<Handle>,
}

impl SignalingChannelBuilder {
    pub fn new(transport: Arc<dyn SignalingTransport>) -> Self {
        Self {
            transport,
            reconnection: ReconnectionConfig::default(),
            exporter: None,
            runtime: Handle::try_current().ok(),
        }
    }

    pub fn reconnection(mut self, config: ReconnectionConfig) -> Self {
        self.reconnection = config;
        self
    }

    pub fn metrics(mut self, exporter: Arc<SignalingMetricsExporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// Runtime used for ticket renewal. Defaults to the runtime the builder
    /// was created on, if any.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> SignalingChannel {
        if self.runtime.is_none() {
            tracing::warn!("no tokio runtime available; reconnection ticket renewal disabled");
        }
        SignalingChannel {
            core: Arc::new(ChannelCore {
                transport: self.transport,
                reconnection: self.reconnection,
                state: Mutex::new(ChannelState {
                    connection: ConnectionState::Disconnected,
                    queue: OutgoingQueue::new(),
                    session: SessionState::default(),
                }),
                observers: ObserverRegistry::new(),
                counters: Counters::new(),
                exporter: self.exporter,
                runtime: self.runtime,
            }),
        }
    }
}

/// Client side of the conference signaling channel.
///
/// Cloning yields another handle to the same channel. When the last handle is
/// dropped every pending message fails with [`SignalingError::ChannelClosed`].
#[derive(Clone)]
pub struct SignalingChannel {
    pub(crate) core: Arc<ChannelCore>,
}

impl SignalingChannel {
    pub fn new(transport: Arc<dyn SignalingTransport>, reconnection: ReconnectionConfig) -> Self {
        SignalingChannelBuilder::new(transport)
            .reconnection(reconnection)
            .build()
    }

    pub fn builder(transport: Arc<dyn SignalingTransport>) -> SignalingChannelBuilder {
        SignalingChannelBuilder::new(transport)
    }

    pub fn add_observer(&self, observer: &Arc<dyn ChannelObserver>) -> ObserverHandle {
        self.core.observers.add(observer)
    }

    pub fn remove_observer(&self, handle: ObserverHandle) -> bool {
        self.core.observers.remove(handle)
    }

    /// Open a session authenticated by `token`.
    ///
    /// Allowed while Disconnected or Reconnecting. From Reconnecting any
    /// resume request still in flight is abandoned and the queued messages
    /// carry over to the new session. On success the queue is drained in
    /// order and the room info is returned. On failure the channel returns to
    /// the state it started from and the queue is left untouched.
    pub async fn connect(&self, token: &str) -> Result<RoomInfo> {
        let started_from = {
            let mut state = self.core.state.lock();
            let current = state.connection;
            match current {
                ConnectionState::Disconnected => {}
                ConnectionState::Reconnecting => state.session.resume_generation += 1,
                ConnectionState::Connecting | ConnectionState::Connected => {
                    return Err(SignalingError::ConnectionError(
                        "already connected or connecting".to_owned(),
                    ));
                }
            }
            state.connection = ConnectionState::Connecting;
            current
        };

        let listener: Arc<dyn TransportListener> = Arc::new(ChannelEvents {
            core: Arc::downgrade(&self.core),
        });
        let room = match self.core.transport.open(token, listener).await {
            Ok(raw) => RoomInfo::new(raw),
            Err(err) => {
                let mut state = self.core.state.lock();
                if state.connection == ConnectionState::Connecting {
                    state.connection = started_from;
                }
                let restored = state.connection;
                drop(state);
                log_lifecycle_event(
                    Some(&LogContext::new().with_state(restored.as_str())),
                    "session.connect",
                    &err.to_string(),
                    LifecycleOutcome::Fault,
                );
                return Err(err.into());
            }
        };

        let drained = {
            let mut state = self.core.state.lock();
            if state.connection != ConnectionState::Connecting {
                drop(state);
                self.core.transport.close();
                return Err(SignalingError::ConnectionError(
                    "connect cancelled by disconnect".to_owned(),
                ));
            }
            state.connection = ConnectionState::Connected;
            // A ticket from an interrupted session does not outlive it.
            if let Some(task) = state.session.refresh_task.take() {
                task.abort();
            }
            state.session.ticket = None;
            state.session.token = Some(token.to_owned());
            state.session.room_id = room.id().map(str::to_owned);
            state.session.attempts = 0;
            self.core.drain_queued_messages(&state)
        };

        if let Some(ticket) = room.reconnection_ticket() {
            self.core.install_ticket(ticket.to_owned());
        }

        let room_id = room.id().unwrap_or_default();
        sig_info!(
            context = LogContext::new().with_room(room_id).with_state("connected"),
            "session opened on {} transport, {} queued message(s) drained",
            self.core.transport.name(),
            drained
        );
        Ok(room)
    }

    /// Close the session.
    ///
    /// Every pending message fails with [`SignalingError::ChannelClosed`]; an
    /// acknowledgment arriving afterwards is ignored. Idempotent.
    pub fn disconnect(&self) {
        let core = &self.core;
        let was = {
            let mut state = core.state.lock();
            let was = state.connection;
            if was == ConnectionState::Connected {
                core.transmit_unqueued(events::LOGOUT, JsonValue::Null, Box::new(|_| {}));
            }
            state.connection = ConnectionState::Disconnected;
            state.session.reset();
            core.drop_queued_messages(&mut state, SignalingError::ChannelClosed);
            was
        };

        if was != ConnectionState::Disconnected {
            core.transport.close();
            log_lifecycle_event(
                Some(&LogContext::new().with_state("disconnected")),
                "session.closed",
                "session closed locally",
                LifecycleOutcome::Success,
            );
            core.observers.notify(|observer| observer.on_session_closed());
        }
    }

    /// Send an arbitrary event through the reliable emitter.
    pub fn emit(&self, event: &str, payload: JsonValue) -> AckReceiver {
        self.core.emit(event, payload)
    }

    pub fn state(&self) -> ConnectionState {
        self.core.state.lock().connection
    }

    /// Identifiers of unacknowledged messages in FIFO order.
    pub fn pending_ids(&self) -> Vec<u64> {
        self.core.state.lock().queue.ids()
    }

    pub fn queue_len(&self) -> usize {
        self.core.state.lock().queue.len()
    }

    pub fn reconnection_ticket(&self) -> Option<ReconnectionTicket> {
        self.core.state.lock().session.ticket.clone()
    }

    pub fn reconnection_attempts(&self) -> u32 {
        self.core.state.lock().session.attempts
    }

    pub fn room_id(&self) -> Option<String> {
        self.core.state.lock().session.room_id.clone()
    }

    pub fn metrics(&self) -> ChannelMetrics {
        self.core.counters.snapshot()
    }
}

/// Adapter handed to the transport; forwards signals while the channel lives.
struct ChannelEvents {
    core: Weak<ChannelCore>,
}

impl TransportListener for ChannelEvents {
    fn on_connected(&self) {
        if let Some(core) = self.core.upgrade() {
            core.handle_transport_connected();
        }
    }

    fn on_disconnected(&self) {
        if let Some(core) = self.core.upgrade() {
            core.handle_transport_disconnected();
        }
    }

    fn on_reconnecting(&self) {
        if let Some(core) = self.core.upgrade() {
            core.handle_transport_reconnecting();
        }
    }

    fn on_reconnection_ticket(&self, token: String) {
        if let Some(core) = self.core.upgrade() {
            core.install_ticket(token);
        }
    }

    fn on_message(&self, event: &str, payload: JsonValue) {
        if let Some(core) = self.core.upgrade() {
            core.observers
                .notify(|observer| observer.on_server_notification(event, &payload));
        }
    }
}
