//! Flight software packet descriptors.
//!
//! Deframed packets start with a 4-byte big-endian descriptor naming what
//! the rest of the packet is.

/// Size of the descriptor at the start of every packet.
pub const DESCRIPTOR_SIZE: usize = 4;

/// Command packet.
pub const FW_PACKET_COMMAND: u32 = 0;

/// Telemetry channel packet.
pub const FW_PACKET_TELEM: u32 = 1;

/// Event log packet.
pub const FW_PACKET_LOG: u32 = 2;

/// File transfer packet.
pub const FW_PACKET_FILE: u32 = 3;

/// Packetized telemetry.
pub const FW_PACKET_PACKETIZED_TLM: u32 = 4;

/// Idle fill.
pub const FW_PACKET_IDLE: u32 = 5;

/// Uplink handshake, synthesized on the ground after a successful write.
pub const FW_PACKET_HAND: u32 = 0xFE;

/// Unknown packet type.
pub const FW_PACKET_UNKNOWN: u32 = 0xFF;

/// Wire encoding of a descriptor.
pub fn descriptor_bytes(descriptor: u32) -> [u8; DESCRIPTOR_SIZE] {
    descriptor.to_be_bytes()
}

/// Read the descriptor at the start of a packet, if it is long enough.
pub fn peek_descriptor(packet: &[u8]) -> Option<u32> {
    let head: [u8; DESCRIPTOR_SIZE] = packet.get(..DESCRIPTOR_SIZE)?.try_into().ok()?;
    Some(u32::from_be_bytes(head))
}

/// Human-readable name for a descriptor.
pub fn descriptor_name(descriptor: u32) -> &'static str {
    match descriptor {
        FW_PACKET_COMMAND => "COMMAND",
        FW_PACKET_TELEM => "TELEM",
        FW_PACKET_LOG => "LOG",
        FW_PACKET_FILE => "FILE",
        FW_PACKET_PACKETIZED_TLM => "PACKETIZED_TLM",
        FW_PACKET_IDLE => "IDLE",
        FW_PACKET_HAND => "HAND",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_descriptor_is_big_endian() {
        assert_eq!(descriptor_bytes(FW_PACKET_HAND), [0x00, 0x00, 0x00, 0xFE]);
    }

    #[test]
    fn peek_reads_leading_descriptor() {
        assert_eq!(peek_descriptor(&[0, 0, 0, 2, 0xAA]), Some(FW_PACKET_LOG));
        assert_eq!(peek_descriptor(&[0, 0, 0]), None);
    }

    #[test]
    fn names_cover_known_and_unknown() {
        assert_eq!(descriptor_name(FW_PACKET_TELEM), "TELEM");
        assert_eq!(descriptor_name(FW_PACKET_HAND), "HAND");
        assert_eq!(descriptor_name(0x1234), "UNKNOWN");
    }
}
