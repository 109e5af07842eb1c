use super::message::PacketKind;

/// Size of the wire header in bytes.
pub const HEADER_SIZE: usize = 8;

/// Wire format revision written into every header.
pub const WIRE_VERSION: u8 = 1;

/// 8-byte wire header prepended to every frame.
///
/// ```text
/// [0..4] payload_length: u32 LE
/// [4]    version: u8
/// [5]    kind: u8
/// [6..8] reserved: u16 (must be 0)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Length of the rkyv body following this header.
    pub payload_length: u32,
    pub version: u8,
    pub kind: PacketKind,
}

impl Header {
    /// Encode header to 8 bytes (little-endian).
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.payload_length.to_le_bytes());
        buf[4] = self.version;
        buf[5] = self.kind as u8;
        buf
    }

    /// Decode header from 8 bytes.
    ///
    /// Returns `None` if the kind byte is invalid.
    pub fn decode(buf: &[u8; HEADER_SIZE]) -> Option<Self> {
        let payload_length = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let version = buf[4];
        let kind = PacketKind::from_u8(buf[5])?;
        Some(Header {
            payload_length,
            version,
            kind,
        })
    }
}
