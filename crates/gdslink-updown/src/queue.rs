use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tracing::warn;

use crate::stats::DownlinkStats;

/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Fixed-capacity FIFO between frame producers and the downlink send stage.
///
/// Pushing never blocks: when the queue is full the new frame is dropped and
/// counted. Popping waits up to a caller-supplied timeout.
#[derive(Debug)]
pub struct BoundedFrameQueue {
    frames: Mutex<VecDeque<Bytes>>,
    available: Condvar,
    capacity: usize,
    dropped: AtomicU64,
}

impl BoundedFrameQueue {
    /// Create a queue holding at most `capacity` frames (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: Mutex::new(VecDeque::with_capacity(capacity)),
            available: Condvar::new(),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Bytes>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `frame` unless the queue is full. Returns whether it was kept.
    pub fn try_push(&self, frame: Bytes) -> bool {
        let mut frames = self.lock();
        if frames.len() >= self.capacity {
            drop(frames);
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(
                size = frame.len(),
                capacity = self.capacity,
                dropped,
                "frame queue full, dropping frame"
            );
            return false;
        }
        frames.push_back(frame);
        drop(frames);
        self.available.notify_one();
        true
    }

    /// Take the oldest frame, waiting up to `timeout` for one to arrive.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Bytes> {
        let frames = self.lock();
        let (mut frames, _) = self
            .available
            .wait_timeout_while(frames, timeout, |frames| frames.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        frames.pop_front()
    }

    /// Take the oldest frame without waiting.
    pub fn try_pop(&self) -> Option<Bytes> {
        self.lock().pop_front()
    }

    /// Move every queued frame into `batch`, oldest first, without waiting.
    pub fn drain_into(&self, batch: &mut Vec<Bytes>) {
        batch.extend(self.lock().drain(..));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Handle that injects locally synthesized frames into the downlink path.
///
/// Frames pushed here reach the ground exactly as if they had been deframed
/// from the wire. Clone it for every extra producer.
#[derive(Debug, Clone)]
pub struct Loopback {
    queue: Arc<BoundedFrameQueue>,
    stats: Arc<DownlinkStats>,
}

impl Loopback {
    pub(crate) fn new(queue: Arc<BoundedFrameQueue>, stats: Arc<DownlinkStats>) -> Self {
        Self { queue, stats }
    }

    /// Queue `frame` for the ground. Returns `false` if it was dropped.
    pub fn queue_frame(&self, frame: Bytes) -> bool {
        let kept = self.queue.try_push(frame);
        if kept {
            self.stats.loopback_frames.incr();
        }
        kept
    }
}
