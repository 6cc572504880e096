//! Connection pool metrics tracking.
//!
//! Provides atomic counters for monitoring pooled sockets and frame flow.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for the connection pool.
#[derive(Debug, Default)]
pub struct PoolMetrics {
    /// Total sockets opened.
    sockets_opened: AtomicU64,

    /// Total sockets closed.
    sockets_closed: AtomicU64,

    /// Total failed socket opens.
    connect_failures: AtomicU64,

    /// Total frames received.
    frames_received: AtomicU64,

    /// Total malformed frames dropped.
    frames_dropped: AtomicU64,

    /// Total subscriber callbacks that panicked.
    callback_panics: AtomicU64,

    /// Total subscribers added.
    subscribers_added: AtomicU64,

    /// Total subscribers removed.
    subscribers_removed: AtomicU64,
}

impl PoolMetrics {
    /// Creates a new metrics instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a socket opened.
    pub fn record_socket_opened(&self) {
        self.sockets_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a socket closed.
    pub fn record_socket_closed(&self) {
        self.sockets_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed socket open.
    pub fn record_connect_failure(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a frame received.
    pub fn record_frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a malformed frame dropped.
    pub fn record_frame_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a panicking callback.
    pub fn record_callback_panic(&self) {
        self.callback_panics.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a subscriber added.
    pub fn record_subscriber_added(&self) {
        self.subscribers_added.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a subscriber removed.
    pub fn record_subscriber_removed(&self) {
        self.subscribers_removed.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the total sockets opened.
    #[must_use]
    pub fn sockets_opened(&self) -> u64 {
        self.sockets_opened.load(Ordering::Relaxed)
    }

    /// Returns the total sockets closed.
    #[must_use]
    pub fn sockets_closed(&self) -> u64 {
        self.sockets_closed.load(Ordering::Relaxed)
    }

    /// Returns the current live sockets.
    #[must_use]
    pub fn active_sockets(&self) -> u64 {
        self.sockets_opened().saturating_sub(self.sockets_closed())
    }

    /// Returns the total failed socket opens.
    #[must_use]
    pub fn connect_failures(&self) -> u64 {
        self.connect_failures.load(Ordering::Relaxed)
    }

    /// Returns the total frames received.
    #[must_use]
    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// Returns the total malformed frames dropped.
    #[must_use]
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    /// Returns the total panicking callbacks.
    #[must_use]
    pub fn callback_panics(&self) -> u64 {
        self.callback_panics.load(Ordering::Relaxed)
    }

    /// Returns the current registered subscribers.
    #[must_use]
    pub fn active_subscribers(&self) -> u64 {
        self.subscribers_added
            .load(Ordering::Relaxed)
            .saturating_sub(self.subscribers_removed.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = PoolMetrics::new();
        assert_eq!(metrics.sockets_opened(), 0);
        assert_eq!(metrics.active_sockets(), 0);
        assert_eq!(metrics.active_subscribers(), 0);
    }

    #[test]
    fn test_metrics_sockets() {
        let metrics = PoolMetrics::new();
        metrics.record_socket_opened();
        metrics.record_socket_opened();
        metrics.record_socket_closed();
        assert_eq!(metrics.sockets_opened(), 2);
        assert_eq!(metrics.active_sockets(), 1);
    }

    #[test]
    fn test_metrics_frames() {
        let metrics = PoolMetrics::new();
        metrics.record_frame_received();
        metrics.record_frame_received();
        metrics.record_frame_dropped();
        metrics.record_callback_panic();
        assert_eq!(metrics.frames_received(), 2);
        assert_eq!(metrics.frames_dropped(), 1);
        assert_eq!(metrics.callback_panics(), 1);
    }

    #[test]
    fn test_metrics_subscribers() {
        let metrics = PoolMetrics::new();
        metrics.record_subscriber_added();
        metrics.record_subscriber_added();
        metrics.record_subscriber_removed();
        assert_eq!(metrics.active_subscribers(), 1);
    }
}
