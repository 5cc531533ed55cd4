use bytes::Bytes;

use crate::error::Result;

/// Packet-level interface to the rest of the ground system.
///
/// The downlink send stage calls [`send_all`](GroundChannel::send_all) and
/// the uplink stage calls [`receive_all`](GroundChannel::receive_all), each
/// from its own thread.
pub trait GroundChannel: Send + Sync {
    /// Prepare the channel. Called by the surrounding process.
    fn open(&self) -> Result<()> {
        Ok(())
    }

    /// Tear the channel down. Called by the surrounding process.
    fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Deliver a batch of frames downstream, in order.
    fn send_all(&self, frames: Vec<Bytes>) -> Result<()>;

    /// Collect pending outbound packets.
    ///
    /// Must return promptly (non-blocking or short-blocking) so the uplink
    /// stage can observe stop requests.
    fn receive_all(&self) -> Result<Vec<Bytes>>;
}
