use bytes::{BufMut, Bytes, BytesMut};
use gdslink_frame::{descriptor_bytes, peek_descriptor, DESCRIPTOR_SIZE, FW_PACKET_HAND};

/// Build the acknowledgment frame for a packet that reached the wire.
///
/// The flight side never acknowledges uplink itself, so the ground receives
/// `FW_PACKET_HAND` (4 bytes, big-endian) followed by the original packet.
pub fn handshake_frame(packet: &[u8]) -> Bytes {
    let mut frame = BytesMut::with_capacity(DESCRIPTOR_SIZE + packet.len());
    frame.put_slice(&descriptor_bytes(FW_PACKET_HAND));
    frame.put_slice(packet);
    frame.freeze()
}

/// Whether `frame` carries the handshake descriptor.
pub fn is_handshake(frame: &[u8]) -> bool {
    peek_descriptor(frame) == Some(FW_PACKET_HAND)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_packet_with_descriptor() {
        let frame = handshake_frame(b"\x00\x00\x00\x00cmd");
        assert_eq!(&frame[..4], &[0x00, 0x00, 0x00, 0xFE]);
        assert_eq!(&frame[4..], b"\x00\x00\x00\x00cmd");
        assert!(is_handshake(&frame));
    }

    #[test]
    fn other_descriptors_are_not_handshakes() {
        assert!(!is_handshake(b"\x00\x00\x00\x01tlm"));
        assert!(!is_handshake(b"\xFE"));
    }
}
