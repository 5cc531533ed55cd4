//! Framing for the gdslink wire.
//!
//! A [`FramerDeframer`] turns ground packets into wire-ready bytes and pulls
//! complete frames back out of an accumulating byte pool. [`FprimeFramer`]
//! implements the F Prime sync-word format:
//! - a 4-byte big-endian start token (`0xDEADBEEF`)
//! - a 4-byte big-endian data length
//! - the data
//! - a 4-byte big-endian checksum (CRC-32 or a fixed marker)
//!
//! Garbage between frames is skipped one byte at a time until the stream
//! resynchronizes on the next valid start token.

pub mod checksum;
pub mod codec;
pub mod descriptor;
pub mod error;

pub use checksum::Checksum;
pub use codec::{
    FprimeFramer, FprimeFramerConfig, FramerDeframer, CHECKSUM_SIZE, DEFAULT_MAX_DATA_SIZE,
    HEADER_SIZE, START_TOKEN,
};
pub use descriptor::{
    descriptor_bytes, descriptor_name, peek_descriptor, DESCRIPTOR_SIZE, FW_PACKET_COMMAND,
    FW_PACKET_FILE, FW_PACKET_HAND, FW_PACKET_IDLE, FW_PACKET_LOG, FW_PACKET_PACKETIZED_TLM,
    FW_PACKET_TELEM, FW_PACKET_UNKNOWN,
};
pub use error::{FrameError, Result};
