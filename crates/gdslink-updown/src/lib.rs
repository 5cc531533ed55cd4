//! Downlink and uplink pipelines for the gdslink bridge.
//!
//! The pipelines are written only against three capabilities:
//! [`Adapter`](gdslink_transport::Adapter) for the wire,
//! [`FramerDeframer`](gdslink_frame::FramerDeframer) for the codec, and
//! [`GroundChannel`](gdslink_ground::GroundChannel) for the ground side.
//!
//! ```text
//! wire ─read─▶ [deframe] ─try_push─▶ BoundedFrameQueue ─▶ [send] ─send_all─▶ ground
//!                                          ▲
//!                                 Loopback │ handshake
//!                                          │
//! wire ◀─write (retried)── [write] ◀─receive_all─────────────────────────── ground
//! ```
//!
//! Every stage runs on its own named thread and checks a per-run
//! cancellation flag between bounded waits, so `stop()` followed by
//! `join()` always returns.

pub mod downlink;
pub mod error;
pub mod handshake;
pub mod queue;
pub mod state;
pub mod stats;
pub mod uplink;

pub use downlink::{DownlinkConfig, Downlinker, DEFAULT_SEND_WAIT};
pub use error::{PipelineError, Result};
pub use handshake::{handshake_frame, is_handshake};
pub use queue::{BoundedFrameQueue, Loopback, DEFAULT_QUEUE_CAPACITY};
pub use state::PipelineState;
pub use stats::{DownlinkSnapshot, LinkSnapshot, UplinkSnapshot};
pub use uplink::{UplinkConfig, Uplinker, DEFAULT_RETRY_COUNT};
