use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{debug, warn};

use crate::checksum::Checksum;
use crate::error::{FrameError, Result};

/// Frame header: start token (4) + length (4) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Frame trailer: checksum (4).
pub const CHECKSUM_SIZE: usize = 4;

/// Start token that opens every frame.
pub const START_TOKEN: u32 = 0xDEAD_BEEF;

/// Default maximum data size accepted when deframing.
pub const DEFAULT_MAX_DATA_SIZE: usize = 4096;

/// Wraps packets for the wire and extracts frames from accumulated bytes.
///
/// Implementations hold no per-stream state: everything a partially received
/// frame needs lives in the caller's pool.
pub trait FramerDeframer: Send + Sync {
    /// Wrap one packet into wire-ready bytes.
    fn frame(&self, packet: &[u8]) -> Result<Bytes>;

    /// Extract the next complete frame from the front of `pool`.
    ///
    /// Consumes the frame, plus any garbage skipped in front of it. Returns
    /// `None` when `pool` holds no complete frame; in that case calling
    /// again with the same bytes returns `None` again.
    fn deframe(&self, pool: &mut BytesMut) -> Option<Bytes>;

    /// Extract every complete frame from `pool`, leaving the remainder in place.
    fn deframe_all(&self, pool: &mut BytesMut) -> Vec<Bytes> {
        let mut frames = Vec::new();
        while let Some(frame) = self.deframe(pool) {
            frames.push(frame);
        }
        frames
    }
}

/// Configuration for [`FprimeFramer`].
#[derive(Debug, Clone)]
pub struct FprimeFramerConfig {
    /// Trailer checksum.
    pub checksum: Checksum,
    /// Largest data size framed. Inbound frames announcing more are treated
    /// as garbage.
    pub max_data_size: usize,
}

impl Default for FprimeFramerConfig {
    fn default() -> Self {
        Self {
            checksum: Checksum::default(),
            max_data_size: DEFAULT_MAX_DATA_SIZE,
        }
    }
}

/// F Prime sync-word framing.
///
/// Wire format:
/// ```text
/// ┌──────────────────┬──────────────┬──────────────┬──────────────────┐
/// │ Start token (4B) │ Length (4B)  │ Data         │ Checksum (4B)    │
/// │ 0xDEADBEEF (BE)  │ (BE)         │ (Length B)   │ (BE)             │
/// └──────────────────┴──────────────┴──────────────┴──────────────────┘
/// ```
#[derive(Debug, Clone, Default)]
pub struct FprimeFramer {
    config: FprimeFramerConfig,
}

impl FprimeFramer {
    /// Create a framer with default configuration (CRC-32, 4096-byte frames).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a framer with explicit configuration.
    pub fn with_config(config: FprimeFramerConfig) -> Self {
        Self { config }
    }

    /// Current framer configuration.
    pub fn config(&self) -> &FprimeFramerConfig {
        &self.config
    }

    /// Encode `data` as one frame, appending it to `dst`.
    ///
    /// Data longer than `max_data_size` is refused, since no deframer with
    /// the same configuration would accept the result.
    pub fn encode(&self, data: &[u8], dst: &mut BytesMut) -> Result<()> {
        if data.len() > self.config.max_data_size {
            return Err(FrameError::PayloadTooLarge {
                size: data.len(),
                max: self.config.max_data_size,
            });
        }
        let length = u32::try_from(data.len()).map_err(|_| FrameError::PayloadTooLarge {
            size: data.len(),
            max: u32::MAX as usize,
        })?;

        let start = dst.len();
        dst.reserve(HEADER_SIZE + data.len() + CHECKSUM_SIZE);
        dst.put_u32(START_TOKEN);
        dst.put_u32(length);
        dst.put_slice(data);
        let checksum = self.config.checksum.compute(&dst[start..]);
        dst.put_u32(checksum);
        Ok(())
    }
}

impl FramerDeframer for FprimeFramer {
    fn frame(&self, packet: &[u8]) -> Result<Bytes> {
        let mut dst = BytesMut::new();
        self.encode(packet, &mut dst)?;
        Ok(dst.freeze())
    }

    fn deframe(&self, pool: &mut BytesMut) -> Option<Bytes> {
        let mut discarded = 0usize;

        let frame = loop {
            if pool.len() < HEADER_SIZE {
                break None;
            }

            let mut header = &pool[..HEADER_SIZE];
            let token = header.get_u32();
            let data_len = header.get_u32() as usize;

            if token == START_TOKEN && data_len <= self.config.max_data_size {
                let checked = HEADER_SIZE + data_len;
                if pool.len() < checked + CHECKSUM_SIZE {
                    break None; // Need more data
                }

                let expected = (&pool[checked..checked + CHECKSUM_SIZE]).get_u32();
                if expected == self.config.checksum.compute(&pool[..checked]) {
                    pool.advance(HEADER_SIZE);
                    let data = pool.split_to(data_len).freeze();
                    pool.advance(CHECKSUM_SIZE);
                    break Some(data);
                }
                warn!(length = data_len, "frame checksum mismatch, resynchronizing");
            }

            pool.advance(1);
            discarded += 1;
        };

        if discarded > 0 {
            debug!(discarded, "skipped bytes while searching for start token");
        }
        frame
    }
}
