use std::collections::HashMap;
use std::net::SocketAddr;

use futures::future::{BoxFuture, try_join_all};
use tokio::sync::{Mutex, mpsc};

use crate::config::MeshConfig;
use crate::error::{MeshError, Result};
use crate::protocol::{Packet, decode_packet, encode_packet};
use crate::transport::connection::PeerLink;
use crate::transport::listener::QuicListener;
use crate::transport::router::{read_record, spawn_reader};
use crate::transport::{Inbound, Transport};
use crate::types::{PROTOCOL_VERSION, Rank};

/// Full-mesh QUIC transport.
///
/// Rank `i` dials every rank below it and accepts a link from every rank
/// above it. Each link carries one persistent stream per direction, opened
/// with a `Hello` record naming the sender.
pub struct QuicTransport {
    rank: Rank,
    world_size: u32,
    listener: QuicListener,
    links: HashMap<Rank, PeerLink>,
    loopback: mpsc::UnboundedSender<Inbound>,
    inbox: Mutex<mpsc::UnboundedReceiver<Inbound>>,
    readers: std::sync::Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl QuicTransport {
    /// Form the mesh. `peers[r]` is the listening address of rank `r`;
    /// `listener` must already be bound to `peers[rank]`.
    ///
    /// Fails if the mesh is not complete within `config.connect_timeout`.
    pub async fn connect(
        listener: QuicListener,
        rank: Rank,
        peers: &[SocketAddr],
        config: &MeshConfig,
    ) -> Result<Self> {
        let world_size = peers.len() as u32;
        if rank >= world_size {
            return Err(MeshError::InvalidRank {
                rank,
                size: world_size,
            });
        }
        let max_frame = config.max_frame_bytes;

        let form = async {
            let dial = async {
                let mut out = Vec::with_capacity(rank as usize);
                for (peer, addr) in peers.iter().enumerate().take(rank as usize) {
                    out.push(dial(&listener, rank, world_size, peer as Rank, *addr, max_frame).await?);
                }
                Ok::<_, MeshError>(out)
            };
            let accept = async {
                let expected = world_size - 1 - rank;
                let mut out = Vec::with_capacity(expected as usize);
                for _ in 0..expected {
                    out.push(accept_one(&listener, rank, world_size, max_frame).await?);
                }
                Ok::<_, MeshError>(out)
            };
            let (mut dialed, accepted) = tokio::try_join!(dial, accept)?;
            dialed.extend(accepted);
            Ok::<_, MeshError>(dialed)
        };

        let established = tokio::time::timeout(config.connect_timeout, form)
            .await
            .map_err(|_| {
                MeshError::transport(format!(
                    "rank {rank}: mesh not formed within {:?}",
                    config.connect_timeout
                ))
            })??;

        let (tx, rx) = mpsc::unbounded_channel();
        let mut links = HashMap::with_capacity(established.len());
        let mut readers = Vec::with_capacity(established.len());
        for (link, recv) in established {
            readers.push(spawn_reader(link.rank, recv, tx.clone(), max_frame));
            links.insert(link.rank, link);
        }

        tracing::debug!(rank, world_size, addr = %listener.local_addr(), "quic mesh formed");

        Ok(Self {
            rank,
            world_size,
            listener,
            links,
            loopback: tx,
            inbox: Mutex::new(rx),
            readers: std::sync::Mutex::new(readers),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }
}

fn hello(rank: Rank, world_size: u32) -> Result<Vec<u8>> {
    encode_packet(&Packet::Hello {
        rank,
        world_size,
        protocol_version: PROTOCOL_VERSION,
    })
}

/// Read the peer's `Hello` and validate it against this mesh.
async fn expect_hello(
    stream: &mut quinn::RecvStream,
    expected: Option<Rank>,
    world_size: u32,
    max_frame: usize,
) -> Result<Rank> {
    let frame = read_record(stream, max_frame)
        .await?
        .ok_or_else(|| MeshError::transport("link closed before hello"))?;

    match decode_packet(&frame)? {
        Packet::Hello {
            rank,
            world_size: remote_world,
            protocol_version,
        } => {
            if protocol_version != PROTOCOL_VERSION {
                return Err(MeshError::ProtocolMismatch {
                    local: PROTOCOL_VERSION,
                    remote: protocol_version,
                });
            }
            if remote_world != world_size {
                return Err(MeshError::transport(format!(
                    "rank {rank} believes world size is {remote_world}, expected {world_size}"
                )));
            }
            if let Some(want) = expected
                && want != rank
            {
                return Err(MeshError::transport(format!(
                    "dialed rank {want} but rank {rank} answered"
                )));
            }
            Ok(rank)
        }
        other => Err(MeshError::DecodeFailed(format!(
            "expected hello, got {:?}",
            other.kind()
        ))),
    }
}

async fn dial(
    listener: &QuicListener,
    rank: Rank,
    world_size: u32,
    peer: Rank,
    addr: SocketAddr,
    max_frame: usize,
) -> Result<(PeerLink, quinn::RecvStream)> {
    let conn = listener.connect(addr).await?;
    let link = PeerLink::open(peer, conn.clone()).await?;
    link.send_frame(&hello(rank, world_size)?).await?;

    let mut recv = conn
        .accept_uni()
        .await
        .map_err(|e| MeshError::transport_with_source(format!("accept stream from {peer}"), e))?;
    expect_hello(&mut recv, Some(peer), world_size, max_frame).await?;
    tracing::debug!(rank, peer, %addr, "dialed peer");
    Ok((link, recv))
}

async fn accept_one(
    listener: &QuicListener,
    rank: Rank,
    world_size: u32,
    max_frame: usize,
) -> Result<(PeerLink, quinn::RecvStream)> {
    let conn = listener.accept().await?;
    let mut recv = conn
        .accept_uni()
        .await
        .map_err(|e| MeshError::transport_with_source("accept stream", e))?;
    let peer = expect_hello(&mut recv, None, world_size, max_frame).await?;
    if peer <= rank {
        return Err(MeshError::transport(format!(
            "rank {peer} dialed rank {rank}; only higher ranks dial"
        )));
    }

    let link = PeerLink::open(peer, conn).await?;
    link.send_frame(&hello(rank, world_size)?).await?;
    tracing::debug!(rank, peer, addr = %link.remote_addr(), "accepted peer");
    Ok((link, recv))
}

impl Transport for QuicTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn world_size(&self) -> u32 {
        self.world_size
    }

    fn send_frame<'a>(&'a self, dest: Rank, frame: &'a [u8]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if dest == self.rank {
                return self
                    .loopback
                    .send(Inbound {
                        src: self.rank,
                        frame: frame.to_vec(),
                    })
                    .map_err(|_| MeshError::transport("loopback closed"));
            }
            let link = self
                .links
                .get(&dest)
                .ok_or(MeshError::UnknownPeer { rank: dest })?;
            link.send_frame(frame).await
        })
    }

    fn recv_frame(&self) -> BoxFuture<'_, Result<Inbound>> {
        Box::pin(async move {
            self.inbox
                .lock()
                .await
                .recv()
                .await
                .ok_or_else(|| MeshError::transport("quic mesh closed"))
        })
    }

    fn close(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            try_join_all(self.links.values().map(|link| link.finish())).await?;

            // Wait for every peer to finish its stream towards us as well.
            let readers = {
                let mut guard = self
                    .readers
                    .lock()
                    .map_err(|_| MeshError::transport("reader list poisoned"))?;
                std::mem::take(&mut *guard)
            };
            for reader in readers {
                let _ = reader.await;
            }

            let endpoint = self.listener.endpoint();
            endpoint.close(0u32.into(), b"closed");
            endpoint.wait_idle().await;
            tracing::debug!(rank = self.rank, "quic mesh closed");
            Ok(())
        })
    }
}
