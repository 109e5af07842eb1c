use futures::future::try_join_all;

use crate::collective::helpers::{CollectiveTag, collective_recv, collective_send};
use crate::comm::Communicator;
use crate::element::Element;
use crate::error::Result;
use crate::types::Rank;

/// Threshold: use flat broadcast for small worlds, tree broadcast for larger.
const TREE_BROADCAST_THRESHOLD: u32 = 4;

/// Tree broadcast: root's `buf` ends up in `buf` on every rank.
///
/// Non-root buffers must have the same length as root's. Falls back to a
/// flat broadcast (root sends to all directly) below
/// `TREE_BROADCAST_THRESHOLD` ranks.
pub(crate) async fn tree_broadcast<T: Element>(
    comm: &Communicator,
    buf: &mut [T],
    root: Rank,
    tag: CollectiveTag,
) -> Result<()> {
    let world = comm.size();

    if world <= 1 {
        return Ok(());
    }

    if world < TREE_BROADCAST_THRESHOLD {
        return flat_broadcast(comm, buf, root, tag).await;
    }

    let rank = comm.rank();

    // Remap ranks so root becomes logical rank 0.
    let logical = |r: Rank| -> Rank { (r + world - root) % world };
    let physical = |l: Rank| -> Rank { (l + root) % world };
    let my_logical = logical(rank);

    if my_logical != 0 {
        let parent = physical((my_logical - 1) / 2);
        let received = collective_recv::<T>(comm, parent, buf.len(), "broadcast", tag).await?;
        buf.copy_from_slice(&received);
    }

    // Send to children concurrently.
    let data: &[T] = buf;
    let children = [2 * my_logical + 1, 2 * my_logical + 2]
        .into_iter()
        .filter(|&child| child < world)
        .map(|child| collective_send(comm, physical(child), data, "broadcast", tag));
    try_join_all(children).await?;

    Ok(())
}

/// Flat broadcast: root sends to all other ranks concurrently.
async fn flat_broadcast<T: Element>(
    comm: &Communicator,
    buf: &mut [T],
    root: Rank,
    tag: CollectiveTag,
) -> Result<()> {
    let world = comm.size();

    if comm.rank() == root {
        let data: &[T] = buf;
        try_join_all(
            (0..world)
                .filter(|&r| r != root)
                .map(|r| collective_send(comm, r, data, "broadcast", tag)),
        )
        .await?;
    } else {
        let received = collective_recv::<T>(comm, root, buf.len(), "broadcast", tag).await?;
        buf.copy_from_slice(&received);
    }

    Ok(())
}
