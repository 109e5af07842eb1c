use crate::error::{MeshError, Result};
use crate::types::Rank;
use tokio::sync::Mutex;

/// The sending half of a link to one peer.
///
/// Every frame to the peer travels on the same unidirectional stream as a
/// `[len: u64 LE][frame]` record, so the peer reads frames in send order.
/// Receiving is done by the router's reader task for this peer.
pub struct PeerLink {
    pub rank: Rank,
    conn: quinn::Connection,
    stream: Mutex<quinn::SendStream>,
}

impl PeerLink {
    /// Open the outbound stream on an established connection.
    pub async fn open(rank: Rank, conn: quinn::Connection) -> Result<Self> {
        let stream = conn
            .open_uni()
            .await
            .map_err(|e| MeshError::transport_with_source(format!("open stream to {rank}"), e))?;
        Ok(Self {
            rank,
            conn,
            stream: Mutex::new(stream),
        })
    }

    /// Append one record to the stream.
    pub async fn send_frame(&self, frame: &[u8]) -> Result<()> {
        let mut stream = self.stream.lock().await;
        stream
            .write_all(&(frame.len() as u64).to_le_bytes())
            .await
            .map_err(|e| MeshError::transport_with_source("write length", e))?;
        stream
            .write_all(frame)
            .await
            .map_err(|e| MeshError::transport_with_source("write frame", e))?;
        Ok(())
    }

    /// Finish the stream and wait until the peer has read all of it.
    pub async fn finish(&self) -> Result<()> {
        let mut stream = self.stream.lock().await;
        stream
            .finish()
            .map_err(|e| MeshError::transport_with_source("finish stream", e))?;
        stream
            .stopped()
            .await
            .map_err(|e| MeshError::transport_with_source("await stream ack", e))?;
        Ok(())
    }

    /// Get the remote address of this link.
    pub fn remote_addr(&self) -> std::net::SocketAddr {
        self.conn.remote_address()
    }
}
