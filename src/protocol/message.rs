use crate::types::{ContextId, Rank};

/// Frames exchanged between matching engines.
///
/// The sender's rank is never carried here; it is implied by the transport
/// link the frame arrived on.
// `tag` fields use the full path: the rkyv derive defines its own `Tag`.
#[derive(rkyv::Archive, rkyv::Serialize, rkyv::Deserialize, Debug, Clone, PartialEq)]
pub enum Packet {
    /// First record on every link, identifying the dialing rank.
    Hello {
        rank: Rank,
        world_size: u32,
        protocol_version: u16,
    },

    /// Complete small message; matched on arrival.
    Eager {
        context: ContextId,
        tag: crate::types::Tag,
        payload: Vec<u8>,
    },

    /// Request-to-send: announces a large message without its payload.
    ///
    /// `seq` is unique per sender and names the transfer in the replies.
    RendezvousRequest {
        context: ContextId,
        tag: crate::types::Tag,
        seq: u64,
        len: u64,
    },

    /// Clear-to-send: the receiver has matched the announced message.
    RendezvousClear { seq: u64 },

    /// Payload of a cleared rendezvous transfer.
    RendezvousData { seq: u64, payload: Vec<u8> },
}

impl Packet {
    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Hello { .. } => PacketKind::Hello,
            Packet::Eager { .. } => PacketKind::Eager,
            Packet::RendezvousRequest { .. } => PacketKind::RendezvousRequest,
            Packet::RendezvousClear { .. } => PacketKind::RendezvousClear,
            Packet::RendezvousData { .. } => PacketKind::RendezvousData,
        }
    }
}

/// Discriminant carried in the frame header so frames can be classified
/// without decoding the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketKind {
    Hello = 0,
    Eager = 1,
    RendezvousRequest = 2,
    RendezvousClear = 3,
    RendezvousData = 4,
}

impl PacketKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(PacketKind::Hello),
            1 => Some(PacketKind::Eager),
            2 => Some(PacketKind::RendezvousRequest),
            3 => Some(PacketKind::RendezvousClear),
            4 => Some(PacketKind::RendezvousData),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_variants_roundtrip() {
        let packets = vec![
            Packet::Hello {
                rank: 3,
                world_size: 8,
                protocol_version: 1,
            },
            Packet::Eager {
                context: 0,
                tag: 7,
                payload: vec![0xFF; 64],
            },
            Packet::RendezvousRequest {
                context: 1 << 31,
                tag: 0,
                seq: 12,
                len: 40_000,
            },
            Packet::RendezvousClear { seq: 12 },
            Packet::RendezvousData {
                seq: 12,
                payload: vec![1, 2, 3],
            },
        ];

        for packet in packets {
            let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&packet).unwrap();
            let back: Packet = rkyv::from_bytes::<Packet, rkyv::rancor::Error>(&bytes).unwrap();
            assert_eq!(packet, back, "roundtrip failed for {packet:?}");
        }
    }

    #[test]
    fn test_tag_field_keeps_full_range() {
        let packet = Packet::RendezvousRequest {
            context: 3,
            tag: u32::MAX,
            seq: 0,
            len: 8,
        };
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&packet).unwrap();
        let back: Packet = rkyv::from_bytes::<Packet, rkyv::rancor::Error>(&bytes).unwrap();
        assert!(matches!(back, Packet::RendezvousRequest { tag: u32::MAX, context: 3, .. }));
    }

    #[test]
    fn test_kind_from_u8() {
        assert_eq!(PacketKind::from_u8(0), Some(PacketKind::Hello));
        assert_eq!(PacketKind::from_u8(4), Some(PacketKind::RendezvousData));
        assert_eq!(PacketKind::from_u8(5), None);
    }

    #[test]
    fn test_kind_matches_variant() {
        let p = Packet::RendezvousClear { seq: 1 };
        assert_eq!(p.kind(), PacketKind::RendezvousClear);
        assert_eq!(p.kind() as u8, 3);
    }
}
