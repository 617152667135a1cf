//! ---
//! confsig_section: "02-signaling-messages"
//! confsig_subsection: "module"
//! confsig_type: "source"
//! confsig_scope: "code"
//! confsig_description: "Signaling wire types, transport boundary, and outgoing queue."
//! confsig_version: "v0.1.0"
//! confsig_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Argument list delivered to an ack handler by the transport.
pub type AckPayload = Vec<JsonValue>;

/// Event names understood by the conference server.
pub mod events {
    /// Full re-authentication with the original credential.
    pub const LOGIN: &str = "login";
    /// Session resumption with a reconnection ticket.
    pub const RELOGIN: &str = "relogin";
    /// Graceful session teardown.
    pub const LOGOUT: &str = "logout";
    /// Request a fresh reconnection ticket.
    pub const REFRESH_RECONNECTION_TICKET: &str = "refreshReconnectionTicket";
    /// Publish initialization.
    pub const PUBLISH: &str = "publish";
    /// Subscribe initialization.
    pub const SUBSCRIBE: &str = "subscribe";
    /// SDP/ICE exchange.
    pub const SIGNALING_MESSAGE: &str = "signaling_message";
    /// Application data relayed to other participants.
    pub const CUSTOM_MESSAGE: &str = "customMessage";
    /// Stream control (mute, resolution and similar actions).
    pub const CONTROL: &str = "control";
    /// Query the mixed-stream region of a stream.
    pub const GET_REGION: &str = "getRegion";
    /// Move a stream into a mixed-stream region.
    pub const SET_REGION: &str = "setRegion";
}

/// Interpreted acknowledgment returned by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Ack {
    /// Positive acknowledgment with optional response data.
    Accepted(Option<JsonValue>),
    /// Negative acknowledgment with the server's reason.
    Rejected(String),
}

impl Ack {
    /// Interpret a raw ack argument list.
    ///
    /// Element 0 carries the status (`"ok"` or `"success"` for a positive ack);
    /// element 1 carries data or, on a negative ack, the reason. A list that does
    /// not follow this shape is reported as `Err` with a description.
    pub fn from_payload(payload: &[JsonValue]) -> Result<Self, String> {
        let Some(status) = payload.first() else {
            return Err("empty acknowledgment".to_owned());
        };
        let Some(status) = status.as_str() else {
            return Err(format!("acknowledgment status is not a string: {status}"));
        };
        match status {
            "ok" | "success" => Ok(Ack::Accepted(payload.get(1).cloned())),
            _ => {
                let reason = payload
                    .get(1)
                    .and_then(JsonValue::as_str)
                    .map(str::to_owned)
                    .unwrap_or_else(|| "negative acknowledgment from server".to_owned());
                Ok(Ack::Rejected(reason))
            }
        }
    }
}

/// Room metadata returned when a session is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomInfo(JsonValue);

impl RoomInfo {
    /// Wrap a raw room description.
    pub fn new(raw: JsonValue) -> Self {
        Self(raw)
    }

    /// Room identifier, if the server sent one.
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(JsonValue::as_str)
    }

    /// Reconnection ticket issued together with the room info.
    pub fn reconnection_ticket(&self) -> Option<&str> {
        self.0.get("reconnectionTicket").and_then(JsonValue::as_str)
    }

    /// Borrow the raw room description.
    pub fn raw(&self) -> &JsonValue {
        &self.0
    }

    /// Consume the wrapper and return the raw description.
    pub fn into_inner(self) -> JsonValue {
        self.0
    }
}

impl From<JsonValue> for RoomInfo {
    fn from(raw: JsonValue) -> Self {
        Self::new(raw)
    }
}
