use crate::error::{MeshError, Result};
use crate::transport::{Inbound, Transport};
use crate::types::Rank;
use futures::future::BoxFuture;
use tokio::sync::{Mutex, mpsc};

/// In-process transport: every rank is a task in the same runtime.
///
/// Each rank owns one unbounded inbox; senders push straight into the
/// destination's inbox, which preserves per-sender order.
pub struct MemoryTransport {
    rank: Rank,
    peers: Vec<mpsc::UnboundedSender<Inbound>>,
    inbox: Mutex<mpsc::UnboundedReceiver<Inbound>>,
}

impl MemoryTransport {
    /// Build a fully connected mesh of `world_size` ranks, indexed by rank.
    pub fn mesh(world_size: u32) -> Vec<MemoryTransport> {
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..world_size).map(|_| mpsc::unbounded_channel()).unzip();

        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| MemoryTransport {
                rank: rank as Rank,
                peers: senders.clone(),
                inbox: Mutex::new(inbox),
            })
            .collect()
    }
}

impl Transport for MemoryTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn world_size(&self) -> u32 {
        self.peers.len() as u32
    }

    fn send_frame<'a>(&'a self, dest: Rank, frame: &'a [u8]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let peer = self
                .peers
                .get(dest as usize)
                .ok_or(MeshError::UnknownPeer { rank: dest })?;
            peer.send(Inbound {
                src: self.rank,
                frame: frame.to_vec(),
            })
            .map_err(|_| MeshError::PeerDisconnected { rank: dest })
        })
    }

    fn recv_frame(&self) -> BoxFuture<'_, Result<Inbound>> {
        Box::pin(async move {
            self.inbox
                .lock()
                .await
                .recv()
                .await
                .ok_or_else(|| MeshError::transport("in-memory mesh closed"))
        })
    }
}
