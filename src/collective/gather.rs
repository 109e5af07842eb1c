use futures::future::try_join_all;

use crate::collective::helpers::{CollectiveTag, collective_send, post_recv, root_only};
use crate::collective::partition::Partition;
use crate::comm::Communicator;
use crate::element::Element;
use crate::error::{MeshError, Result};
use crate::types::Rank;

/// Gather: root collects an equal chunk from every rank, in rank order.
///
/// Only root passes `recv`, and it must hold exactly `send.len() * world`
/// elements.
pub(crate) async fn gather<T: Element>(
    comm: &Communicator,
    send: &[T],
    recv: Option<&mut [T]>,
    root: Rank,
    tag: CollectiveTag,
) -> Result<()> {
    let recv = root_only(comm, root, recv, "gather")?;
    let layout = Partition::from_counts(vec![send.len(); comm.size() as usize]);

    let recv = match recv {
        Some(buf) if buf.len() != layout.total() => {
            return Err(MeshError::InvalidLayout {
                operation: "gather",
                reason: format!(
                    "root buffer holds {} elements, expected {} x {} ranks",
                    buf.len(),
                    send.len(),
                    comm.size()
                ),
            });
        }
        other => other,
    };

    collect(comm, send, recv.map(|b| (b, &layout)), root, "gather", tag).await
}

/// Variable gather: rank `i` contributes exactly `layout.count(i)`
/// elements, which root places at `layout.range(i)` of `recv`.
///
/// Elements of `recv` outside every chunk are left untouched.
pub(crate) async fn gatherv<T: Element>(
    comm: &Communicator,
    send: &[T],
    recv: Option<(&mut [T], &Partition)>,
    root: Rank,
    tag: CollectiveTag,
) -> Result<()> {
    let recv = root_only(comm, root, recv, "gatherv")?;
    if let Some((buf, layout)) = &recv {
        layout.check(comm.size() as usize, buf.len(), "gatherv")?;
        if layout.count(root) != send.len() {
            return Err(MeshError::InvalidLayout {
                operation: "gatherv",
                reason: format!(
                    "root contributes {} elements but its chunk holds {}",
                    send.len(),
                    layout.count(root)
                ),
            });
        }
    }
    collect(comm, send, recv, root, "gatherv", tag).await
}

async fn collect<T: Element>(
    comm: &Communicator,
    send: &[T],
    recv: Option<(&mut [T], &Partition)>,
    root: Rank,
    operation: &'static str,
    tag: CollectiveTag,
) -> Result<()> {
    let Some((buf, layout)) = recv else {
        return collective_send(comm, root, send, operation, tag).await;
    };

    let world = comm.size();
    let peers: Vec<Rank> = (0..world).filter(|&r| r != root).collect();
    let pending = peers
        .iter()
        .map(|&r| post_recv::<T>(comm, r, layout.count(r), operation, tag))
        .collect::<Result<Vec<_>>>()?;

    buf[layout.range(root)].copy_from_slice(send);

    let chunks = try_join_all(pending.into_iter().map(|p| p.finish::<T>(operation))).await?;
    for (&r, chunk) in peers.iter().zip(chunks) {
        buf[layout.range(r)].copy_from_slice(&chunk);
    }

    tracing::trace!(rank = root, tag, operation, total = layout.total(), "gather collected");
    Ok(())
}
