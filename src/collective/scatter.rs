use futures::future::try_join_all;

use crate::collective::helpers::{
    CollectiveTag, collective_recv_into, collective_send, root_only,
};
use crate::collective::partition::Partition;
use crate::comm::Communicator;
use crate::element::Element;
use crate::error::{MeshError, Result};
use crate::types::Rank;

/// Scatter: root distributes one equal chunk to each rank.
///
/// Root sends the `i`-th `recv.len()`-element chunk of `send` to rank `i`.
/// Only root passes `send`, and it must hold exactly `recv.len() * world`
/// elements.
pub(crate) async fn scatter<T: Element>(
    comm: &Communicator,
    send: Option<&[T]>,
    recv: &mut [T],
    root: Rank,
    tag: CollectiveTag,
) -> Result<()> {
    let send = root_only(comm, root, send, "scatter")?;
    let chunk = recv.len();
    let layout = Partition::from_counts(vec![chunk; comm.size() as usize]);

    if let Some(data) = send {
        if data.len() != layout.total() {
            return Err(MeshError::InvalidLayout {
                operation: "scatter",
                reason: format!(
                    "root buffer holds {} elements, expected {chunk} x {} ranks",
                    data.len(),
                    comm.size()
                ),
            });
        }
    }

    let received = distribute(comm, send.map(|d| (d, &layout)), recv, root, "scatter", tag).await?;
    if received != chunk {
        return Err(MeshError::BufferSizeMismatch {
            expected: chunk,
            actual: received,
        });
    }
    Ok(())
}

/// Variable scatter: rank `i` receives `layout.count(i)` elements taken
/// from `layout.range(i)` of the root buffer.
///
/// Returns the number of elements this rank received, placed at the front
/// of `recv`.
pub(crate) async fn scatterv<T: Element>(
    comm: &Communicator,
    send: Option<(&[T], &Partition)>,
    recv: &mut [T],
    root: Rank,
    tag: CollectiveTag,
) -> Result<usize> {
    let send = root_only(comm, root, send, "scatterv")?;
    if let Some((data, layout)) = send {
        layout.check(comm.size() as usize, data.len(), "scatterv")?;
    }
    distribute(comm, send, recv, root, "scatterv", tag).await
}

async fn distribute<T: Element>(
    comm: &Communicator,
    send: Option<(&[T], &Partition)>,
    recv: &mut [T],
    root: Rank,
    operation: &'static str,
    tag: CollectiveTag,
) -> Result<usize> {
    let Some((data, layout)) = send else {
        return collective_recv_into(comm, root, recv, operation, tag).await;
    };

    let own = &data[layout.range(root)];
    if own.len() > recv.len() {
        return Err(MeshError::Truncated {
            capacity: recv.len() * T::SIZE,
            actual: own.len() * T::SIZE,
        });
    }
    recv[..own.len()].copy_from_slice(own);

    let world = comm.size();
    let sends = (0..world)
        .filter(|&r| r != root)
        .map(|r| collective_send(comm, r, &data[layout.range(r)], operation, tag));
    try_join_all(sends).await?;

    tracing::trace!(rank = root, tag, operation, total = layout.total(), "scatter distributed");
    Ok(own.len())
}
