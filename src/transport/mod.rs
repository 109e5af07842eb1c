//! Frame transports connecting the ranks of a mesh.

mod connection;
mod listener;
mod memory;
mod quic;
mod router;
pub(crate) mod tls;

use crate::error::Result;
use crate::types::Rank;
use futures::future::BoxFuture;

pub use connection::PeerLink;
pub use listener::QuicListener;
pub use memory::MemoryTransport;
pub use quic::QuicTransport;

/// A frame received from a peer.
#[derive(Debug)]
pub struct Inbound {
    pub src: Rank,
    pub frame: Vec<u8>,
}

/// Reliable frame delivery between the ranks of a fixed mesh.
///
/// Frames sent to one destination arrive in the order they were sent.
/// Sending to `rank()` delivers to this rank's own inbox.
///
/// Only one task calls `recv_frame` at a time.
pub trait Transport: Send + Sync + 'static {
    fn rank(&self) -> Rank;

    fn world_size(&self) -> u32;

    fn send_frame<'a>(&'a self, dest: Rank, frame: &'a [u8]) -> BoxFuture<'a, Result<()>>;

    fn recv_frame(&self) -> BoxFuture<'_, Result<Inbound>>;

    /// Flush outbound links and release them. Frames already handed to
    /// `send_frame` are delivered before this completes.
    fn close(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}
