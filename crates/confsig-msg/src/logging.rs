//! ---
//! confsig_section: "02-signaling-messages"
//! confsig_subsection: "module"
//! confsig_type: "source"
//! confsig_scope: "code"
//! confsig_description: "Signaling wire types, transport boundary, and outgoing queue."
//! confsig_version: "v0.1.0"
//! confsig_owner: "tbd"
//! ---
use std::time::Duration;

use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry};
use tracing::debug;

/// Direction of the message movement, used for consistent logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    /// First transmission of a message.
    Outbound,
    /// Re-transmission during a queue drain.
    Drained,
    /// Acknowledgment received from the server.
    Acknowledged,
    /// Message failed without an acknowledgment.
    Dropped,
}

/// Emit a structured log entry for message activity.
pub fn log_message(direction: MessageDirection, message_id: u64, event: &str) {
    debug!(
        message_id,
        event,
        direction = ?direction,
        "signaling activity"
    );
}

/// Prometheus metric handles for signaling activity.
pub struct SignalingMetricsExporter {
    emitted: IntCounter,
    acknowledged: IntCounter,
    failed: IntCounter,
    drained: IntCounter,
    ack_latency: Histogram,
}

impl SignalingMetricsExporter {
    /// Register signaling metrics with the provided registry.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let emitted = IntCounter::with_opts(Opts::new(
            "signaling_messages_emitted_total",
            "Messages accepted by the reliable emitter",
        ))?;
        let acknowledged = IntCounter::with_opts(Opts::new(
            "signaling_messages_acknowledged_total",
            "Messages completed by a positive acknowledgment",
        ))?;
        let failed = IntCounter::with_opts(Opts::new(
            "signaling_messages_failed_total",
            "Messages completed with a failure",
        ))?;
        let drained = IntCounter::with_opts(Opts::new(
            "signaling_messages_drained_total",
            "Messages re-sent after a (re)connection",
        ))?;
        let ack_latency = Histogram::with_opts(HistogramOpts::new(
            "signaling_ack_latency_seconds",
            "Observed latency between enqueue and acknowledgment",
        ))?;

        registry.register(Box::new(emitted.clone()))?;
        registry.register(Box::new(acknowledged.clone()))?;
        registry.register(Box::new(failed.clone()))?;
        registry.register(Box::new(drained.clone()))?;
        registry.register(Box::new(ack_latency.clone()))?;

        Ok(Self {
            emitted,
            acknowledged,
            failed,
            drained,
            ack_latency,
        })
    }

    /// Record an emitted message.
    pub fn observe_emitted(&self) {
        self.emitted.inc();
    }

    /// Record an acknowledged message and its latency.
    pub fn observe_acknowledged(&self, latency: Duration) {
        self.acknowledged.inc();
        self.ack_latency.observe(latency.as_secs_f64());
    }

    /// Record failed messages.
    pub fn observe_failed(&self, count: u64) {
        self.failed.inc_by(count);
    }

    /// Record drained messages.
    pub fn observe_drained(&self, count: u64) {
        self.drained.inc_by(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_exporter_records_counts() {
        let registry = Registry::new();
        let metrics = SignalingMetricsExporter::register(&registry).expect("register metrics");
        metrics.observe_emitted();
        metrics.observe_acknowledged(Duration::from_millis(10));
        metrics.observe_failed(2);
        metrics.observe_drained(1);

        let families = registry.gather();
        let failed = families
            .iter()
            .find(|f| f.get_name() == "signaling_messages_failed_total")
            .expect("failed counter registered");
        assert_eq!(failed.get_metric()[0].get_counter().get_value(), 2.0);
    }
}
