use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use gdslink_frame::FramerDeframer;
use gdslink_ground::{GroundChannel, GroundError};
use gdslink_transport::Adapter;
use tracing::{trace, warn};

use crate::error::Result;
use crate::queue::{BoundedFrameQueue, Loopback, DEFAULT_QUEUE_CAPACITY};
use crate::state::{PipelineState, RunFlag, StageFn, Stages};
use crate::stats::{DownlinkSnapshot, DownlinkStats};

/// Default bound on the send stage's wait for a frame.
pub const DEFAULT_SEND_WAIT: Duration = Duration::from_millis(500);

const INITIAL_POOL_CAPACITY: usize = 8 * 1024;

/// Configuration for [`Downlinker`].
#[derive(Debug, Clone)]
pub struct DownlinkConfig {
    /// Frames held between the deframe and send stages.
    pub queue_capacity: usize,
    /// How long the send stage waits for a frame before checking for stop.
    pub send_wait: Duration,
}

impl Default for DownlinkConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            send_wait: DEFAULT_SEND_WAIT,
        }
    }
}

/// Wire-to-ground pipeline.
///
/// Runs two threads. `downlink-deframe` reads the adapter, accumulates bytes
/// and pushes every complete frame into the queue without ever waiting on
/// it. `downlink-send` batches whatever is queued into one
/// [`GroundChannel::send_all`] call.
pub struct Downlinker {
    adapter: Arc<dyn Adapter>,
    deframer: Arc<dyn FramerDeframer>,
    ground: Arc<dyn GroundChannel>,
    config: DownlinkConfig,
    queue: Arc<BoundedFrameQueue>,
    stats: Arc<DownlinkStats>,
    stages: Stages,
}

impl Downlinker {
    pub fn new(
        adapter: Arc<dyn Adapter>,
        deframer: Arc<dyn FramerDeframer>,
        ground: Arc<dyn GroundChannel>,
        config: DownlinkConfig,
    ) -> Self {
        Self {
            queue: Arc::new(BoundedFrameQueue::new(config.queue_capacity)),
            stats: Arc::new(DownlinkStats::default()),
            stages: Stages::new("downlink"),
            adapter,
            deframer,
            ground,
            config,
        }
    }

    /// Handle for injecting frames into this pipeline's queue.
    pub fn loopback(&self) -> Loopback {
        Loopback::new(Arc::clone(&self.queue), Arc::clone(&self.stats))
    }

    /// Spawn the deframe and send stages.
    pub fn start(&self) -> Result<()> {
        let deframe: StageFn = {
            let adapter = Arc::clone(&self.adapter);
            let deframer = Arc::clone(&self.deframer);
            let queue = Arc::clone(&self.queue);
            let stats = Arc::clone(&self.stats);
            Box::new(move |run: RunFlag| {
                deframe_stage(adapter.as_ref(), deframer.as_ref(), &queue, &stats, &run)
            })
        };
        let send: StageFn = {
            let ground = Arc::clone(&self.ground);
            let queue = Arc::clone(&self.queue);
            let stats = Arc::clone(&self.stats);
            let wait = self.config.send_wait;
            Box::new(move |run: RunFlag| send_stage(ground.as_ref(), &queue, &stats, wait, &run))
        };
        self.stages.start(vec![("deframe", deframe), ("send", send)])
    }

    /// Request both stages to exit. Returns immediately.
    pub fn stop(&self) {
        self.stages.stop();
    }

    /// Wait for both stages; returns the first stage failure.
    pub fn join(&self) -> Result<()> {
        self.stages.join()
    }

    /// Whether a stage thread has exited, normally or not.
    pub fn is_finished(&self) -> bool {
        self.stages.is_finished()
    }

    pub fn state(&self) -> PipelineState {
        self.stages.state()
    }

    pub fn config(&self) -> &DownlinkConfig {
        &self.config
    }

    pub fn stats(&self) -> DownlinkSnapshot {
        self.stats.snapshot(self.queue.dropped(), self.queue.len())
    }
}

fn deframe_stage(
    adapter: &dyn Adapter,
    deframer: &dyn FramerDeframer,
    queue: &BoundedFrameQueue,
    stats: &DownlinkStats,
    run: &RunFlag,
) -> Result<()> {
    let mut pool = BytesMut::with_capacity(INITIAL_POOL_CAPACITY);

    while run.is_running() {
        let chunk = match adapter.read() {
            Ok(chunk) => chunk,
            Err(err) => return run.fail_unless_stopping("deframe", err.into()),
        };
        if chunk.is_empty() {
            continue;
        }
        stats.bytes_read.add(chunk.len() as u64);
        pool.extend_from_slice(&chunk);

        for frame in deframer.deframe_all(&mut pool) {
            stats.frames_deframed.incr();
            trace!(size = frame.len(), "deframed");
            queue.try_push(frame);
        }
    }
    Ok(())
}

fn send_stage(
    ground: &dyn GroundChannel,
    queue: &BoundedFrameQueue,
    stats: &DownlinkStats,
    wait: Duration,
    run: &RunFlag,
) -> Result<()> {
    while run.is_running() {
        let Some(first) = queue.pop_timeout(wait) else {
            continue;
        };
        let mut batch = vec![first];
        queue.drain_into(&mut batch);
        let count = batch.len() as u64;

        match ground.send_all(batch) {
            Ok(()) => {
                stats.frames_sent.add(count);
                stats.send_batches.incr();
            }
            Err(GroundError::Closed) => {
                return run.fail_unless_stopping("send", GroundError::Closed.into());
            }
            Err(err) => {
                stats.send_errors.incr();
                warn!(frames = count, error = %err, "ground send failed, batch lost");
            }
        }
    }
    Ok(())
}
