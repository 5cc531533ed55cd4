//! Lock-free link counters.
//!
//! Each pipeline owns one counter block shared with its stage threads.
//! `snapshot()` copies the counters into a plain serializable struct.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub(crate) struct Counter(AtomicU64);

impl Counter {
    pub(crate) fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn incr(&self) {
        self.add(1);
    }

    pub(crate) fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Live downlink counters.
#[derive(Debug, Default)]
pub struct DownlinkStats {
    pub(crate) bytes_read: Counter,
    pub(crate) frames_deframed: Counter,
    pub(crate) loopback_frames: Counter,
    pub(crate) frames_sent: Counter,
    pub(crate) send_batches: Counter,
    pub(crate) send_errors: Counter,
}

impl DownlinkStats {
    pub(crate) fn snapshot(&self, frames_dropped: u64, queued: usize) -> DownlinkSnapshot {
        DownlinkSnapshot {
            bytes_read: self.bytes_read.get(),
            frames_deframed: self.frames_deframed.get(),
            frames_dropped,
            loopback_frames: self.loopback_frames.get(),
            frames_sent: self.frames_sent.get(),
            send_batches: self.send_batches.get(),
            send_errors: self.send_errors.get(),
            queued,
        }
    }
}

/// Point-in-time copy of the downlink counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DownlinkSnapshot {
    /// Raw bytes read from the wire.
    pub bytes_read: u64,
    /// Frames extracted from the byte pool.
    pub frames_deframed: u64,
    /// Frames discarded because the queue was full.
    pub frames_dropped: u64,
    /// Frames injected through the loopback handle.
    pub loopback_frames: u64,
    /// Frames handed to the ground channel.
    pub frames_sent: u64,
    /// `send_all` calls that succeeded.
    pub send_batches: u64,
    /// `send_all` calls that failed.
    pub send_errors: u64,
    /// Frames waiting in the queue.
    pub queued: usize,
}

/// Live uplink counters.
#[derive(Debug, Default)]
pub struct UplinkStats {
    pub(crate) packets_received: Counter,
    pub(crate) packets_written: Counter,
    pub(crate) write_attempts: Counter,
    pub(crate) write_failures: Counter,
    pub(crate) handshakes: Counter,
    pub(crate) framing_errors: Counter,
}

impl UplinkStats {
    pub(crate) fn snapshot(&self) -> UplinkSnapshot {
        UplinkSnapshot {
            packets_received: self.packets_received.get(),
            packets_written: self.packets_written.get(),
            write_attempts: self.write_attempts.get(),
            write_failures: self.write_failures.get(),
            handshakes: self.handshakes.get(),
            framing_errors: self.framing_errors.get(),
        }
    }
}

/// Point-in-time copy of the uplink counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UplinkSnapshot {
    /// Non-empty packets taken from the ground channel.
    pub packets_received: u64,
    /// Packets written to the wire.
    pub packets_written: u64,
    /// Individual `write` calls.
    pub write_attempts: u64,
    /// Packets abandoned after every retry failed.
    pub write_failures: u64,
    /// Handshake frames accepted by the downlink queue.
    pub handshakes: u64,
    /// Packets the framer refused.
    pub framing_errors: u64,
}

/// Both directions of a link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkSnapshot {
    pub downlink: DownlinkSnapshot,
    pub uplink: UplinkSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_serializes_with_field_names() {
        let stats = UplinkStats::default();
        stats.packets_received.add(2);
        stats.write_attempts.incr();

        let json = serde_json::to_value(LinkSnapshot {
            uplink: stats.snapshot(),
            ..LinkSnapshot::default()
        })
        .unwrap();
        assert_eq!(json["uplink"]["packets_received"], 2);
        assert_eq!(json["uplink"]["write_attempts"], 1);
        assert_eq!(json["downlink"]["frames_sent"], 0);
    }
}
