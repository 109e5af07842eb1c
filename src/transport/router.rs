use crate::error::{MeshError, Result};
use crate::transport::Inbound;
use crate::types::Rank;
use tokio::sync::mpsc;

/// Read one `[len: u64 LE][frame]` record.
///
/// Returns `Ok(None)` when the peer finished the stream on a record boundary.
pub(crate) async fn read_record(
    stream: &mut quinn::RecvStream,
    max_frame: usize,
) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 8];
    match stream.read_exact(&mut len_buf).await {
        Ok(()) => {}
        Err(quinn::ReadExactError::FinishedEarly(0)) => return Ok(None),
        Err(e) => return Err(MeshError::transport_with_source("read length", e)),
    }

    let len = u64::from_le_bytes(len_buf) as usize;
    if len > max_frame {
        return Err(MeshError::transport(format!(
            "frame of {len} bytes exceeds limit of {max_frame}"
        )));
    }

    let mut frame = vec![0u8; len];
    stream
        .read_exact(&mut frame)
        .await
        .map_err(|e| MeshError::transport_with_source("read frame", e))?;
    Ok(Some(frame))
}

/// Spawn the reader for one peer's inbound stream.
///
/// Every frame is forwarded, tagged with the peer's rank, into the shared
/// inbox the matching engine drains.
pub(crate) fn spawn_reader(
    src: Rank,
    mut stream: quinn::RecvStream,
    inbox: mpsc::UnboundedSender<Inbound>,
    max_frame: usize,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match read_record(&mut stream, max_frame).await {
                Ok(Some(frame)) => {
                    tracing::trace!(src, bytes = frame.len(), "frame received");
                    if inbox.send(Inbound { src, frame }).is_err() {
                        return;
                    }
                }
                Ok(None) => {
                    tracing::debug!(src, "peer finished its stream");
                    return;
                }
                Err(e) => {
                    tracing::warn!(src, error = %e, "reader stopped");
                    return;
                }
            }
        }
    })
}
