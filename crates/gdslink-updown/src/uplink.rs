use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use gdslink_frame::FramerDeframer;
use gdslink_ground::{GroundChannel, GroundError};
use gdslink_transport::Adapter;
use tracing::{debug, warn};

use crate::error::Result;
use crate::handshake::handshake_frame;
use crate::queue::Loopback;
use crate::state::{PipelineState, RunFlag, StageFn, Stages};
use crate::stats::{UplinkSnapshot, UplinkStats};

/// Default number of write attempts per packet.
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Configuration for [`Uplinker`].
#[derive(Debug, Clone)]
pub struct UplinkConfig {
    /// Write attempts per packet before it is abandoned (at least one).
    pub retry_count: u32,
    /// Pause after a ground receive error before trying again.
    pub error_backoff: Duration,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            retry_count: DEFAULT_RETRY_COUNT,
            error_backoff: Duration::from_millis(100),
        }
    }
}

/// Ground-to-wire pipeline.
///
/// One `uplink-write` thread pulls packets from the ground, frames them and
/// writes them in order. Each packet that reaches the wire is acknowledged
/// to the ground through the downlink [`Loopback`].
pub struct Uplinker {
    adapter: Arc<dyn Adapter>,
    framer: Arc<dyn FramerDeframer>,
    ground: Arc<dyn GroundChannel>,
    loopback: Loopback,
    config: UplinkConfig,
    stats: Arc<UplinkStats>,
    stages: Stages,
}

impl Uplinker {
    pub fn new(
        adapter: Arc<dyn Adapter>,
        framer: Arc<dyn FramerDeframer>,
        ground: Arc<dyn GroundChannel>,
        loopback: Loopback,
        config: UplinkConfig,
    ) -> Self {
        Self {
            adapter,
            framer,
            ground,
            loopback,
            config,
            stats: Arc::new(UplinkStats::default()),
            stages: Stages::new("uplink"),
        }
    }

    /// Spawn the write stage.
    pub fn start(&self) -> Result<()> {
        let stage = UplinkStage {
            adapter: Arc::clone(&self.adapter),
            framer: Arc::clone(&self.framer),
            ground: Arc::clone(&self.ground),
            loopback: self.loopback.clone(),
            stats: Arc::clone(&self.stats),
            retry_count: self.config.retry_count.max(1),
            error_backoff: self.config.error_backoff,
        };
        let body: StageFn = Box::new(move |run: RunFlag| stage.run(&run));
        self.stages.start(vec![("write", body)])
    }

    /// Request the write stage to exit. Returns immediately.
    pub fn stop(&self) {
        self.stages.stop();
    }

    /// Wait for the write stage; returns its failure if it had one.
    pub fn join(&self) -> Result<()> {
        self.stages.join()
    }

    pub fn is_finished(&self) -> bool {
        self.stages.is_finished()
    }

    pub fn state(&self) -> PipelineState {
        self.stages.state()
    }

    pub fn config(&self) -> &UplinkConfig {
        &self.config
    }

    pub fn stats(&self) -> UplinkSnapshot {
        self.stats.snapshot()
    }
}

struct UplinkStage {
    adapter: Arc<dyn Adapter>,
    framer: Arc<dyn FramerDeframer>,
    ground: Arc<dyn GroundChannel>,
    loopback: Loopback,
    stats: Arc<UplinkStats>,
    retry_count: u32,
    error_backoff: Duration,
}

impl UplinkStage {
    fn run(&self, run: &RunFlag) -> Result<()> {
        while run.is_running() {
            let packets = match self.ground.receive_all() {
                Ok(packets) => packets,
                Err(GroundError::Closed) => {
                    return run.fail_unless_stopping("write", GroundError::Closed.into());
                }
                Err(err) => {
                    warn!(error = %err, "ground receive failed");
                    thread::sleep(self.error_backoff);
                    continue;
                }
            };

            for packet in packets.into_iter().filter(|packet| !packet.is_empty()) {
                if let Err(err) = self.uplink(packet) {
                    return run.fail_unless_stopping("write", err.into());
                }
            }
        }
        Ok(())
    }

    fn uplink(&self, packet: Bytes) -> gdslink_transport::Result<()> {
        self.stats.packets_received.incr();

        let framed = match self.framer.frame(&packet) {
            Ok(framed) => framed,
            Err(err) => {
                self.stats.framing_errors.incr();
                warn!(size = packet.len(), error = %err, "cannot frame packet, skipping");
                return Ok(());
            }
        };

        if !self.write_with_retry(&framed)? {
            self.stats.write_failures.incr();
            warn!(
                bytes = framed.len(),
                retries = self.retry_count,
                "uplink write failed, packet abandoned"
            );
            return Ok(());
        }

        self.stats.packets_written.incr();
        if self.loopback.queue_frame(handshake_frame(&packet)) {
            self.stats.handshakes.incr();
        }
        Ok(())
    }

    fn write_with_retry(&self, framed: &[u8]) -> gdslink_transport::Result<bool> {
        for attempt in 1..=self.retry_count {
            self.stats.write_attempts.incr();
            if self.adapter.write(framed)? {
                return Ok(true);
            }
            debug!(attempt, of = self.retry_count, "write attempt failed");
        }
        Ok(false)
    }
}
