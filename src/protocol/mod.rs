pub(crate) mod codec;
pub(crate) mod header;
mod message;

pub use codec::{decode_packet, encode_packet};
pub use header::{HEADER_SIZE, Header, WIRE_VERSION};
pub use message::{Packet, PacketKind};
