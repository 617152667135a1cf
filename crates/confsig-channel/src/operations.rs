//! ---
//! confsig_section: "02-signaling-channel"
//! confsig_subsection: "module"
//! confsig_type: "source"
//! confsig_scope: "code"
//! confsig_description: "Reliable signaling channel and session management."
//! confsig_version: "v0.1.0"
//! confsig_owner: "tbd"
//! ---
//! Conference operations built on the reliable emitter.
//!
//! Every operation enqueues its message before returning; the returned future
//! only waits for the outcome. Dropping the future does not cancel the send.

use std::future::Future;

use confsig_msg::events;
use serde_json::{json, Value as JsonValue};

use crate::channel::SignalingChannel;
use crate::emitter::AckReceiver;
use crate::error::{Result, SignalingError};

/// Key carrying the local stream label in a publish request.
const STREAM_LABEL_KEY: &str = "streamLabel";

impl SignalingChannel {
    /// Ask the server to set up a publication or subscription.
    ///
    /// With `publish_stream_label` the request is a `publish` carrying the
    /// label; without it, a `subscribe`. Resolves to the server's response
    /// data, typically the new stream id. A publish whose `options` is
    /// neither an object nor null fails with
    /// [`SignalingError::InvalidRequest`] and is never sent.
    pub fn send_initialization_message(
        &self,
        options: JsonValue,
        publish_stream_label: Option<&str>,
    ) -> impl Future<Output = Result<Option<JsonValue>>> + Send + 'static {
        let sent = match publish_stream_label {
            Some(label) => labelled_publish(options, label)
                .map(|payload| self.core.emit(events::PUBLISH, payload)),
            None => Ok(self.core.emit(events::SUBSCRIBE, options)),
        };
        async move { sent?.await }
    }

    /// Relay an SDP or ICE candidate message.
    pub fn send_sdp(
        &self,
        message: JsonValue,
    ) -> impl Future<Output = Result<()>> + Send + 'static {
        discard_data(self.core.emit(events::SIGNALING_MESSAGE, message))
    }

    /// Send a stream lifecycle event such as `unpublish` or `unsubscribe`.
    pub fn send_stream_event(
        &self,
        event: &str,
        stream_id: &str,
    ) -> impl Future<Output = Result<()>> + Send + 'static {
        discard_data(self.core.emit(event, json!({ "id": stream_id })))
    }

    /// Deliver application data to `receiver`, or to everyone in the room when
    /// `receiver` is empty.
    pub fn send_custom_message(
        &self,
        message: &str,
        receiver: &str,
    ) -> impl Future<Output = Result<()>> + Send + 'static {
        let payload = json!({
            "type": "data",
            "data": message,
            "receiver": receiver,
        });
        discard_data(self.core.emit(events::CUSTOM_MESSAGE, payload))
    }

    pub fn send_stream_control_message(
        &self,
        stream_id: &str,
        action: &str,
    ) -> impl Future<Output = Result<()>> + Send + 'static {
        let payload = json!({ "id": stream_id, "action": action });
        discard_data(self.core.emit(events::CONTROL, payload))
    }

    /// Region of `stream_id` in the mixed stream.
    ///
    /// Fails with [`SignalingError::InvalidResponse`] when the acknowledgment
    /// carries no `region` string.
    pub fn get_region(
        &self,
        stream_id: &str,
    ) -> impl Future<Output = Result<String>> + Send + 'static {
        let ack = self.core.emit(events::GET_REGION, json!({ "id": stream_id }));
        async move {
            let data = ack.await?;
            data.as_ref()
                .and_then(|data| data.get("region"))
                .and_then(JsonValue::as_str)
                .map(str::to_owned)
                .ok_or_else(|| {
                    SignalingError::InvalidResponse("getRegion ack carries no region".to_owned())
                })
        }
    }

    pub fn set_region(
        &self,
        stream_id: &str,
        region_id: &str,
    ) -> impl Future<Output = Result<()>> + Send + 'static {
        let payload = json!({ "id": stream_id, "region": region_id });
        discard_data(self.core.emit(events::SET_REGION, payload))
    }
}

fn labelled_publish(options: JsonValue, label: &str) -> Result<JsonValue> {
    let mut fields = match options {
        JsonValue::Object(fields) => fields,
        JsonValue::Null => Default::default(),
        other => {
            return Err(SignalingError::InvalidRequest(format!(
                "publish options must be an object, got {other}"
            )))
        }
    };
    fields.insert(STREAM_LABEL_KEY.to_owned(), JsonValue::from(label));
    Ok(JsonValue::Object(fields))
}

fn discard_data(ack: AckReceiver) -> impl Future<Output = Result<()>> + Send + 'static {
    async move { ack.await.map(|_| ()) }
}
