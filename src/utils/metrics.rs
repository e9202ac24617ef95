//! Per-connection counters.
//!
//! Each [`crate::connection::Connection`] owns one [`ConnectionMetrics`];
//! there is no global collector. Counters are relaxed atomics, read through
//! [`ConnectionMetrics::snapshot`].

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug)]
pub struct ConnectionMetrics {
    opened_at: Instant,
    socket_bytes_in: AtomicU64,
    socket_bytes_out: AtomicU64,
    dispatched: AtomicU64,
    unknown: AtomicU64,
    sent: AtomicU64,
    decode_failures: AtomicU64,
    socket_failures: AtomicU64,
}

impl ConnectionMetrics {
    pub fn new() -> Self {
        Self {
            opened_at: Instant::now(),
            socket_bytes_in: AtomicU64::default(),
            socket_bytes_out: AtomicU64::default(),
            dispatched: AtomicU64::default(),
            unknown: AtomicU64::default(),
            sent: AtomicU64::default(),
            decode_failures: AtomicU64::default(),
            socket_failures: AtomicU64::default(),
        }
    }

    /// Raw bytes read from the socket.
    pub fn bytes_received(&self, count: u64) {
        self.socket_bytes_in.fetch_add(count, Relaxed);
    }

    /// One packet handed to the socket as `wire_bytes` bytes.
    pub fn packet_sent(&self, wire_bytes: u64) {
        self.sent.fetch_add(1, Relaxed);
        self.socket_bytes_out.fetch_add(wire_bytes, Relaxed);
    }

    pub fn packet_dispatched(&self) {
        self.dispatched.fetch_add(1, Relaxed);
    }

    pub fn packet_unknown(&self) {
        self.unknown.fetch_add(1, Relaxed);
    }

    pub fn decode_failure(&self) {
        self.decode_failures.fetch_add(1, Relaxed);
    }

    pub fn connection_error(&self) {
        self.socket_failures.fetch_add(1, Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_received: self.socket_bytes_in.load(Relaxed),
            bytes_sent: self.socket_bytes_out.load(Relaxed),
            packets_dispatched: self.dispatched.load(Relaxed),
            packets_unknown: self.unknown.load(Relaxed),
            packets_sent: self.sent.load(Relaxed),
            decode_failures: self.decode_failures.load(Relaxed),
            connection_errors: self.socket_failures.load(Relaxed),
            uptime_seconds: self.opened_at.elapsed().as_secs(),
        }
    }

    /// Emits the current counters as one structured `info` event.
    pub fn log_metrics(&self) {
        let MetricsSnapshot {
            bytes_received,
            bytes_sent,
            packets_dispatched,
            packets_unknown,
            packets_sent,
            decode_failures,
            connection_errors,
            uptime_seconds,
        } = self.snapshot();
        info!(
            bytes_received,
            bytes_sent,
            packets_dispatched,
            packets_unknown,
            packets_sent,
            decode_failures,
            connection_errors,
            uptime_seconds,
            "Session totals"
        );
    }
}

impl Default for ConnectionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`ConnectionMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub packets_dispatched: u64,
    pub packets_unknown: u64,
    pub packets_sent: u64,
    pub decode_failures: u64,
    pub connection_errors: u64,
    pub uptime_seconds: u64,
}

/// Debug-logs the elapsed time of a named step when dropped.
pub struct Timer {
    label: &'static str,
    started: Instant,
}

impl Timer {
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            started: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let elapsed_us = self.started.elapsed().as_micros() as u64;
        debug!(step = self.label, elapsed_us, "Step finished");
    }
}
