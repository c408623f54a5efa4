//! Optional, zero-cost-when-disabled channel metrics.
//!
//! [`Metrics`] lives inside [`crate::ring::Core`] and is updated from `&self`
//! through plain relaxed atomics — counters are advisory, not synchronizing,
//! so there is no reason to pay for anything stronger. When a channel is
//! built with `enable_metrics: false` every update is skipped after a single
//! branch, and [`Channel::metrics`](crate::Channel::metrics) returns a
//! zeroed snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub(crate) struct Metrics {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    batches_sent: AtomicU64,
    batches_received: AtomicU64,
    producer_parks: AtomicU64,
    consumer_parks: AtomicU64,
}

impl Metrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn on_send(&self, enabled: bool, n: u64) {
        if enabled {
            self.messages_sent.fetch_add(n, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn on_send_batch(&self, enabled: bool, n: u64) {
        if enabled {
            self.messages_sent.fetch_add(n, Ordering::Relaxed);
            self.batches_sent.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn on_receive(&self, enabled: bool, n: u64) {
        if enabled {
            self.messages_received.fetch_add(n, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn on_receive_batch(&self, enabled: bool, n: u64) {
        if enabled {
            self.messages_received.fetch_add(n, Ordering::Relaxed);
            self.batches_received.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn on_producer_park(&self, enabled: bool) {
        if enabled {
            self.producer_parks.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn on_consumer_park(&self, enabled: bool) {
        if enabled {
            self.consumer_parks.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn snapshot(&self, enabled: bool) -> MetricsSnapshot {
        if !enabled {
            return MetricsSnapshot::default();
        }
        MetricsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            batches_received: self.batches_received.load(Ordering::Relaxed),
            producer_parks: self.producer_parks.load(Ordering::Relaxed),
            consumer_parks: self.consumer_parks.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of a channel's counters, returned by
/// [`crate::Channel::metrics`]. All zero if the channel was built with
/// metrics disabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub batches_sent: u64,
    pub batches_received: u64,
    pub producer_parks: u64,
    pub consumer_parks: u64,
}
