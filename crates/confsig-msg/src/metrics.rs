//! ---
//! confsig_section: "02-signaling-messages"
//! confsig_subsection: "module"
//! confsig_type: "source"
//! confsig_scope: "code"
//! confsig_description: "Signaling wire types, transport boundary, and outgoing queue."
//! confsig_version: "v0.1.0"
//! confsig_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of channel delivery metrics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMetrics {
    /// Messages accepted by `emit`.
    pub emitted: u64,
    /// Messages completed by a positive acknowledgment.
    pub acknowledged: u64,
    /// Messages completed with a failure (drop, rejection, malformed ack).
    pub failed: u64,
    /// Messages transmitted by a queue drain.
    pub drained: u64,
}

/// Lock-free counters backing [`ChannelMetrics`].
#[derive(Debug, Default)]
pub struct Counters {
    emitted: AtomicU64,
    acknowledged: AtomicU64,
    failed: AtomicU64,
    drained: AtomicU64,
}

impl Counters {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an emitted message.
    pub fn record_emitted(&self) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an acknowledged message.
    pub fn record_acknowledged(&self) {
        self.acknowledged.fetch_add(1, Ordering::Relaxed);
    }

    /// Count `count` failed messages.
    pub fn record_failed(&self, count: u64) {
        self.failed.fetch_add(count, Ordering::Relaxed);
    }

    /// Count `count` drained messages.
    pub fn record_drained(&self, count: u64) {
        self.drained.fetch_add(count, Ordering::Relaxed);
    }

    /// Take a consistent-enough snapshot for dashboards and tests.
    pub fn snapshot(&self) -> ChannelMetrics {
        ChannelMetrics {
            emitted: self.emitted.load(Ordering::Relaxed),
            acknowledged: self.acknowledged.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            drained: self.drained.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_counts() {
        let counters = Counters::new();
        counters.record_emitted();
        counters.record_emitted();
        counters.record_acknowledged();
        counters.record_failed(1);
        counters.record_drained(2);

        assert_eq!(
            counters.snapshot(),
            ChannelMetrics {
                emitted: 2,
                acknowledged: 1,
                failed: 1,
                drained: 2,
            }
        );
    }
}
