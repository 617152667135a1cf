//! ---
//! confsig_section: "02-signaling-messages"
//! confsig_subsection: "module"
//! confsig_type: "source"
//! confsig_scope: "code"
//! confsig_description: "Signaling wire types, transport boundary, and outgoing queue."
//! confsig_version: "v0.1.0"
//! confsig_owner: "tbd"
//! ---
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;

use crate::types::AckPayload;
use crate::{Result, TransportError};

/// Callback invoked once with the server's response to an emitted event.
pub type AckHandler = Box<dyn FnOnce(AckPayload) + Send + 'static>;

/// Receiver of inbound lifecycle signals and server notifications.
///
/// Transports call these from their own I/O context. Implementations must not
/// be invoked while the transport holds internal locks.
pub trait TransportListener: Send + Sync {
    /// The connection was (re)established.
    fn on_connected(&self);
    /// The connection was lost.
    fn on_disconnected(&self);
    /// The transport started another reconnection attempt.
    fn on_reconnecting(&self);
    /// The server issued a fresh reconnection ticket.
    fn on_reconnection_ticket(&self, token: String);
    /// The server pushed an unsolicited event.
    fn on_message(&self, event: &str, payload: JsonValue);
}

/// Event-based transport the signaling channel runs on.
///
/// `emit` must return without invoking `ack` synchronously; acks and listener
/// callbacks arrive later from the transport's I/O context.
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    /// Open a session authenticated by `credential`, returning the room info.
    async fn open(
        &self,
        credential: &str,
        listener: Arc<dyn TransportListener>,
    ) -> Result<JsonValue>;
    /// Emit a named event; `ack` fires once if the server answers.
    fn emit(&self, event: &str, payload: JsonValue, ack: AckHandler) -> Result<()>;
    /// Tear the connection down. Idempotent.
    fn close(&self);
    /// Human-readable transport name for logging/metrics.
    fn name(&self) -> &'static str;
}

/// Frame recorded by [`InMemoryTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedFrame {
    /// Position in the emission log, starting at 0.
    pub seq: usize,
    /// Event name.
    pub event: String,
    /// Event payload.
    pub payload: JsonValue,
}

enum OpenBehaviour {
    Accept(JsonValue),
    Reject(String),
}

struct InMemoryState {
    open_behaviour: OpenBehaviour,
    listener: Option<Arc<dyn TransportListener>>,
    connected: bool,
    credentials: Vec<String>,
    frames: Vec<EmittedFrame>,
    ack_handlers: HashMap<usize, AckHandler>,
    refused_events: HashSet<String>,
    close_count: usize,
}

/// In-memory transport for tests, demos, and loopback runs.
///
/// Records every emitted frame and lets the caller acknowledge frames and
/// inject lifecycle signals, playing the role of the server side.
#[derive(Clone)]
pub struct InMemoryTransport {
    state: Arc<Mutex<InMemoryState>>,
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryState {
                open_behaviour: OpenBehaviour::Accept(JsonValue::Object(Default::default())),
                listener: None,
                connected: false,
                credentials: Vec::new(),
                frames: Vec::new(),
                ack_handlers: HashMap::new(),
                refused_events: HashSet::new(),
                close_count: 0,
            })),
        }
    }
}

impl InMemoryTransport {
    /// Create a transport that accepts every credential with empty room info.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept subsequent `open` calls, returning `room_info`.
    pub fn accept_with(&self, room_info: JsonValue) {
        self.state.lock().open_behaviour = OpenBehaviour::Accept(room_info);
    }

    /// Reject subsequent `open` calls with `reason`.
    pub fn reject_with(&self, reason: impl Into<String>) {
        self.state.lock().open_behaviour = OpenBehaviour::Reject(reason.into());
    }

    /// Make `emit` fail for `event` while the connection stays up.
    pub fn refuse_event(&self, event: &str) {
        self.state.lock().refused_events.insert(event.to_owned());
    }

    /// Let every event through again.
    pub fn accept_all_events(&self) {
        self.state.lock().refused_events.clear();
    }

    /// Whether the connection is currently up.
    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// Credentials passed to `open`, in call order.
    pub fn credentials(&self) -> Vec<String> {
        self.state.lock().credentials.clone()
    }

    /// Every frame emitted so far.
    pub fn frames(&self) -> Vec<EmittedFrame> {
        self.state.lock().frames.clone()
    }

    /// Frames emitted for `event`.
    pub fn frames_for(&self, event: &str) -> Vec<EmittedFrame> {
        self.state
            .lock()
            .frames
            .iter()
            .filter(|frame| frame.event == event)
            .cloned()
            .collect()
    }

    /// Number of `close` calls observed.
    pub fn close_count(&self) -> usize {
        self.state.lock().close_count
    }

    /// Deliver `ack` to the handler of frame `seq`. Returns `false` when the
    /// frame is unknown or was already acknowledged.
    pub fn ack(&self, seq: usize, ack: AckPayload) -> bool {
        let handler = self.state.lock().ack_handlers.remove(&seq);
        match handler {
            Some(handler) => {
                handler(ack);
                true
            }
            None => false,
        }
    }

    /// Positively acknowledge frame `seq` without data.
    pub fn ack_ok(&self, seq: usize) -> bool {
        self.ack(seq, vec![JsonValue::from("ok")])
    }

    /// Positively acknowledge frame `seq` with `data`.
    pub fn ack_with(&self, seq: usize, data: JsonValue) -> bool {
        self.ack(seq, vec![JsonValue::from("success"), data])
    }

    /// Negatively acknowledge frame `seq` with `reason`.
    pub fn nack(&self, seq: usize, reason: &str) -> bool {
        self.ack(seq, vec![JsonValue::from("error"), JsonValue::from(reason)])
    }

    /// Simulate a dropped connection.
    pub fn simulate_disconnect(&self) {
        let listener = {
            let mut state = self.state.lock();
            state.connected = false;
            state.listener.clone()
        };
        if let Some(listener) = listener {
            listener.on_disconnected();
        }
    }

    /// Simulate one reconnection attempt.
    pub fn simulate_reconnecting(&self) {
        if let Some(listener) = self.listener() {
            listener.on_reconnecting();
        }
    }

    /// Simulate a successful transport-level reconnection.
    pub fn simulate_reconnected(&self) {
        let listener = {
            let mut state = self.state.lock();
            if state.listener.is_some() {
                state.connected = true;
            }
            state.listener.clone()
        };
        if let Some(listener) = listener {
            listener.on_connected();
        }
    }

    /// Deliver a reconnection ticket to the listener.
    pub fn issue_ticket(&self, token: impl Into<String>) {
        if let Some(listener) = self.listener() {
            listener.on_reconnection_ticket(token.into());
        }
    }

    /// Push an unsolicited server event to the listener.
    pub fn push_message(&self, event: &str, payload: JsonValue) {
        if let Some(listener) = self.listener() {
            listener.on_message(event, payload);
        }
    }

    fn listener(&self) -> Option<Arc<dyn TransportListener>> {
        self.state.lock().listener.clone()
    }
}

#[async_trait]
impl SignalingTransport for InMemoryTransport {
    async fn open(
        &self,
        credential: &str,
        listener: Arc<dyn TransportListener>,
    ) -> Result<JsonValue> {
        let mut state = self.state.lock();
        state.credentials.push(credential.to_owned());
        let outcome = match &state.open_behaviour {
            OpenBehaviour::Accept(room_info) => Ok(room_info.clone()),
            OpenBehaviour::Reject(reason) => Err(TransportError::Open(reason.clone())),
        };
        if outcome.is_ok() {
            state.listener = Some(listener);
            state.connected = true;
        }
        outcome
    }

    fn emit(&self, event: &str, payload: JsonValue, ack: AckHandler) -> Result<()> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        if state.refused_events.contains(event) {
            return Err(TransportError::Emit(format!("{event} refused")));
        }
        let seq = state.frames.len();
        state.frames.push(EmittedFrame {
            seq,
            event: event.to_owned(),
            payload,
        });
        state.ack_handlers.insert(seq, ack);
        Ok(())
    }

    fn close(&self) {
        let mut state = self.state.lock();
        state.connected = false;
        state.listener = None;
        state.close_count += 1;
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}
