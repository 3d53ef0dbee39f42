//! Transport statistics

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Snapshot of request/response traffic on one management link
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportStats {
    /// Frames handed to the transport
    pub frames_sent: u64,
    /// Frames received (matching or not)
    pub frames_received: u64,
    /// Received frames discarded as not matching the outstanding request
    pub frames_dropped: u64,
    /// Receive attempts that timed out
    pub timeouts: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Total bytes received
    pub bytes_received: u64,
    /// Time since the accumulator was created
    pub duration: Duration,
}

impl TransportStats {
    /// Fraction of received frames that were dropped, in percent
    pub fn drop_rate(&self) -> f64 {
        if self.frames_received == 0 {
            return 0.0;
        }
        (self.frames_dropped as f64 / self.frames_received as f64) * 100.0
    }

    /// Format statistics as human-readable string
    pub fn format(&self) -> String {
        format!(
            "Sent: {} frames ({} bytes)\n\
             Received: {} frames ({} bytes)\n\
             Dropped: {} frames ({:.2}%)\n\
             Timeouts: {}\n\
             Duration: {:.2}s",
            self.frames_sent,
            self.bytes_sent,
            self.frames_received,
            self.bytes_received,
            self.frames_dropped,
            self.drop_rate(),
            self.timeouts,
            self.duration.as_secs_f64(),
        )
    }
}

/// Thread-safe statistics accumulator
#[derive(Debug, Clone)]
pub struct StatsAccumulator {
    frames_sent: Arc<AtomicU64>,
    frames_received: Arc<AtomicU64>,
    frames_dropped: Arc<AtomicU64>,
    timeouts: Arc<AtomicU64>,
    bytes_sent: Arc<AtomicU64>,
    bytes_received: Arc<AtomicU64>,
    start_time: Instant,
}

impl StatsAccumulator {
    /// Create a new statistics accumulator
    pub fn new() -> Self {
        Self {
            frames_sent: Arc::new(AtomicU64::new(0)),
            frames_received: Arc::new(AtomicU64::new(0)),
            frames_dropped: Arc::new(AtomicU64::new(0)),
            timeouts: Arc::new(AtomicU64::new(0)),
            bytes_sent: Arc::new(AtomicU64::new(0)),
            bytes_received: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    /// Record a sent frame
    pub fn record_sent(&self, size: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(size as u64, Ordering::Relaxed);
    }

    /// Record a received frame
    pub fn record_received(&self, size: usize) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(size as u64, Ordering::Relaxed);
    }

    /// Record a discarded frame
    pub fn record_drop(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a receive timeout
    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current statistics snapshot
    pub fn snapshot(&self) -> TransportStats {
        TransportStats {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            duration: self.start_time.elapsed(),
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.frames_sent.store(0, Ordering::Relaxed);
        self.frames_received.store(0, Ordering::Relaxed);
        self.frames_dropped.store(0, Ordering::Relaxed);
        self.timeouts.store(0, Ordering::Relaxed);
        self.bytes_sent.store(0, Ordering::Relaxed);
        self.bytes_received.store(0, Ordering::Relaxed);
    }
}

impl Default for StatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_accumulator_basic() {
        let acc = StatsAccumulator::new();
        acc.record_sent(60);
        acc.record_received(64);
        acc.record_received(128);
        acc.record_drop();
        acc.record_timeout();

        let snap = acc.snapshot();
        assert_eq!(snap.frames_sent, 1);
        assert_eq!(snap.bytes_sent, 60);
        assert_eq!(snap.frames_received, 2);
        assert_eq!(snap.bytes_received, 192);
        assert_eq!(snap.frames_dropped, 1);
        assert_eq!(snap.timeouts, 1);
        assert_eq!(snap.drop_rate(), 50.0);
    }

    #[test]
    fn test_drop_rate_zero_frames() {
        assert_eq!(TransportStats::default().drop_rate(), 0.0);
    }

    #[test]
    fn test_reset() {
        let acc = StatsAccumulator::new();
        acc.record_sent(10);
        acc.record_drop();
        acc.reset();
        let snap = acc.snapshot();
        assert_eq!(snap.frames_sent, 0);
        assert_eq!(snap.frames_dropped, 0);
    }

    #[test]
    fn test_format() {
        let acc = StatsAccumulator::new();
        acc.record_sent(60);
        let text = acc.snapshot().format();
        assert!(text.contains("Sent: 1 frames (60 bytes)"));
    }

    #[test]
    fn test_thread_safety() {
        let acc = StatsAccumulator::new();
        let clone = acc.clone();

        let handle = thread::spawn(move || {
            for _ in 0..100 {
                clone.record_received(64);
            }
        });
        for _ in 0..100 {
            acc.record_received(64);
        }
        handle.join().unwrap();

        assert_eq!(acc.snapshot().frames_received, 200);
    }
}
