//! ---
//! confsig_section: "02-signaling-channel"
//! confsig_subsection: "module"
//! confsig_type: "source"
//! confsig_scope: "code"
//! confsig_description: "Reliable signaling channel and session management."
//! confsig_version: "v0.1.0"
//! confsig_owner: "tbd"
//! ---
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

/// Renewals are never scheduled sooner than this.
const MIN_REFRESH_DELAY: Duration = Duration::from_secs(1);

/// Server-issued credential that lets a dropped session resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectionTicket {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    /// Expiry decoded from the token, when it carries one.
    pub not_after: Option<DateTime<Utc>>,
}

impl ReconnectionTicket {
    pub fn new(token: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        let token = token.into();
        let not_after = decode_not_after(&token);
        Self {
            token,
            issued_at,
            not_after,
        }
    }

    /// How long to wait before asking for a fresh ticket.
    pub fn refresh_delay(
        &self,
        now: DateTime<Utc>,
        margin: Duration,
        fallback: Duration,
    ) -> Duration {
        let Some(not_after) = self.not_after else {
            return fallback;
        };
        // An expiry or margin outside chrono's range means renewal is due now.
        let refresh_at = chrono::Duration::from_std(margin)
            .ok()
            .and_then(|margin| not_after.checked_sub_signed(margin));
        let Some(refresh_at) = refresh_at else {
            return MIN_REFRESH_DELAY;
        };
        refresh_at
            .signed_duration_since(now)
            .to_std()
            .unwrap_or(Duration::ZERO)
            .max(MIN_REFRESH_DELAY)
    }
}

/// Tickets are base64-encoded JSON documents with a `notAfter` timestamp in
/// milliseconds. Anything else is treated as an opaque token without expiry.
fn decode_not_after(token: &str) -> Option<DateTime<Utc>> {
    let bytes = STANDARD.decode(token.trim()).ok()?;
    let document: JsonValue = serde_json::from_slice(&bytes).ok()?;
    let millis = document.get("notAfter")?.as_i64()?;
    DateTime::from_timestamp_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn encoded(document: JsonValue) -> String {
        STANDARD.encode(document.to_string())
    }

    #[test]
    fn expiry_is_decoded_from_structured_token() {
        let token = encoded(json!({"participantId": "p1", "notAfter": 1_700_000_600_000i64}));
        let issued = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let ticket = ReconnectionTicket::new(token, issued);
        assert_eq!(
            ticket.not_after,
            Some(Utc.timestamp_millis_opt(1_700_000_600_000).unwrap())
        );

        let delay =
            ticket.refresh_delay(issued, Duration::from_secs(60), Duration::from_secs(300));
        assert_eq!(delay, Duration::from_secs(540));
    }

    #[test]
    fn opaque_token_uses_fallback_interval() {
        let ticket = ReconnectionTicket::new("not base64 at all!", Utc::now());
        assert_eq!(ticket.not_after, None);
        assert_eq!(
            ticket.refresh_delay(Utc::now(), Duration::from_secs(60), Duration::from_secs(300)),
            Duration::from_secs(300)
        );
    }

    #[test]
    fn nearly_expired_ticket_refreshes_promptly() {
        let issued = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let token = encoded(json!({"notAfter": 1_700_000_010_000i64}));
        let ticket = ReconnectionTicket::new(token, issued);
        let delay =
            ticket.refresh_delay(issued, Duration::from_secs(60), Duration::from_secs(300));
        assert_eq!(delay, MIN_REFRESH_DELAY);
    }

    #[test]
    fn expiry_at_the_edge_of_time_refreshes_promptly() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let token = encoded(json!({"notAfter": DateTime::<Utc>::MIN_UTC.timestamp_millis()}));
        let ticket = ReconnectionTicket::new(token, now);
        assert!(ticket.not_after.is_some());
        assert_eq!(
            ticket.refresh_delay(now, Duration::from_secs(60), Duration::from_secs(300)),
            MIN_REFRESH_DELAY
        );
    }

    #[test]
    fn oversized_margin_refreshes_promptly() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let token = encoded(json!({"notAfter": 1_700_000_600_000i64}));
        let ticket = ReconnectionTicket::new(token, now);
        for margin in [Duration::from_secs(1_000_000_000_000_000), Duration::MAX] {
            assert_eq!(
                ticket.refresh_delay(now, margin, Duration::from_secs(300)),
                MIN_REFRESH_DELAY
            );
        }
    }
}
