//! Bidirectional bridge between a flight wire link and the ground.
//!
//! gdslink reads raw bytes from the flight peer, deframes them and forwards
//! the frames to a ground distribution server; in the other direction it
//! frames ground packets, writes them to the wire with bounded retry and
//! acknowledges each delivered packet to the ground with a handshake frame.
//!
//! # Crate Structure
//!
//! - [`transport`]: wire adapter capability and stream socket adapters
//! - [`frame`]: framer/deframer capability and F Prime framing
//! - [`ground`]: ground channel capability and the TCP distribution client
//! - [`updown`]: the downlink and uplink pipelines

/// Re-export transport types.
pub mod transport {
    pub use gdslink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use gdslink_frame::*;
}

/// Re-export ground types.
pub mod ground {
    pub use gdslink_ground::*;
}

/// Re-export pipeline types.
pub mod updown {
    pub use gdslink_updown::*;
}
