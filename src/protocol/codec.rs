use rkyv::util::AlignedVec;

use crate::error::{MeshError, Result};
use crate::protocol::header::{HEADER_SIZE, Header, WIRE_VERSION};
use crate::protocol::message::Packet;

/// Encode a `Packet` into a framed byte buffer: `[header][rkyv body]`.
pub fn encode_packet(packet: &Packet) -> Result<Vec<u8>> {
    let body = rkyv::to_bytes::<rkyv::rancor::Error>(packet)
        .map_err(|e| MeshError::EncodeFailed(e.to_string()))?;

    if body.len() > u32::MAX as usize {
        return Err(MeshError::EncodeFailed(format!(
            "body too large for framed header: {} bytes exceeds u32::MAX",
            body.len()
        )));
    }

    let header = Header {
        payload_length: body.len() as u32,
        version: WIRE_VERSION,
        kind: packet.kind(),
    };

    let mut buf = Vec::with_capacity(HEADER_SIZE + body.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(&body);
    Ok(buf)
}

/// Decode a framed byte buffer back into a `Packet`.
pub fn decode_packet(buf: &[u8]) -> Result<Packet> {
    if buf.len() < HEADER_SIZE {
        return Err(MeshError::DecodeFailed(format!(
            "frame too short: {} < {HEADER_SIZE}",
            buf.len()
        )));
    }

    let header_bytes: &[u8; HEADER_SIZE] = buf[..HEADER_SIZE]
        .try_into()
        .map_err(|_| MeshError::DecodeFailed("header slice length mismatch".into()))?;

    let header = Header::decode(header_bytes)
        .ok_or_else(|| MeshError::DecodeFailed("invalid header: unknown packet kind".into()))?;

    if header.version != WIRE_VERSION {
        return Err(MeshError::DecodeFailed(format!(
            "unsupported wire version {}",
            header.version
        )));
    }

    let body_end = HEADER_SIZE + header.payload_length as usize;
    if buf.len() < body_end {
        return Err(MeshError::DecodeFailed(format!(
            "frame too short for body: {} < {body_end}",
            buf.len()
        )));
    }

    // The body sits at an arbitrary offset in `buf`; rkyv needs it aligned.
    let mut body = AlignedVec::<16>::with_capacity(body_end - HEADER_SIZE);
    body.extend_from_slice(&buf[HEADER_SIZE..body_end]);

    let packet = rkyv::from_bytes::<Packet, rkyv::rancor::Error>(&body)
        .map_err(|e| MeshError::DecodeFailed(e.to_string()))?;

    if packet.kind() != header.kind {
        return Err(MeshError::DecodeFailed(format!(
            "header kind {:?} does not match body {:?}",
            header.kind,
            packet.kind()
        )));
    }

    Ok(packet)
}
