use crate::collective::broadcast::tree_broadcast;
use crate::collective::helpers::{CollectiveTag, exchange};
use crate::collective::partition::Partition;
use crate::collective::reduce::tree_reduce;
use crate::comm::Communicator;
use crate::error::Result;
use crate::reduce::{Reducible, reduce_slice};
use crate::types::ReduceOp;

/// Allreduce: every rank ends up with the element-wise combination of all
/// ranks' `send`.
///
/// Buffers with at least one element per rank use the ring algorithm.
/// Shorter buffers reduce to rank 0 and broadcast the result, which takes
/// a second collective tag.
pub(crate) async fn all_reduce<T: Reducible>(
    comm: &Communicator,
    send: &[T],
    op: ReduceOp,
    tag: CollectiveTag,
) -> Result<Vec<T>> {
    let world = comm.size() as usize;

    if world <= 1 {
        return Ok(send.to_vec());
    }

    if send.len() >= world {
        return ring_allreduce(comm, send, op, tag).await;
    }

    let reduced = tree_reduce(comm, send, op, 0, tag).await?;
    let mut buf = reduced.unwrap_or_else(|| vec![T::default(); send.len()]);
    tree_broadcast(comm, &mut buf, 0, comm.next_collective_tag()).await?;
    Ok(buf)
}

/// Ring-allreduce.
///
/// Algorithm:
/// 1. Scatter-reduce: N-1 rounds. Each rank sends one chunk to the next rank
///    and receives one chunk from the previous rank, reducing in place.
/// 2. Allgather: N-1 rounds. Each rank forwards its fully reduced chunk to
///    the next rank and receives from the previous rank.
///
/// Chunks follow [`Partition::even`], so the first `len % N` chunks carry
/// one extra element.
async fn ring_allreduce<T: Reducible>(
    comm: &Communicator,
    send: &[T],
    op: ReduceOp,
    tag: CollectiveTag,
) -> Result<Vec<T>> {
    let world = comm.size() as usize;
    let rank = comm.rank() as usize;

    let mut buf = send.to_vec();
    let chunks = Partition::even(buf.len(), comm.size());
    let chunk = |i: usize| chunks.range(i as u32);

    let next = ((rank + 1) % world) as u32;
    let prev = ((rank + world - 1) % world) as u32;

    // Phase 1: scatter-reduce.
    for step in 0..(world - 1) {
        let send_idx = (rank + world - step) % world;
        let recv_idx = (rank + world - step - 1) % world;
        let recv_range = chunk(recv_idx);

        let received = exchange(
            comm,
            next,
            &buf[chunk(send_idx)],
            prev,
            recv_range.len(),
            "allreduce",
            tag,
        )
        .await?;
        reduce_slice(&mut buf[recv_range], &received, op)?;
    }

    // Phase 2: allgather. After scatter-reduce, rank r holds the reduced
    // chunk (r + 1) % N.
    for step in 0..(world - 1) {
        let send_idx = (rank + world + 1 - step) % world;
        let recv_idx = (rank + world - step) % world;
        let recv_range = chunk(recv_idx);

        let received = exchange(
            comm,
            next,
            &buf[chunk(send_idx)],
            prev,
            recv_range.len(),
            "allreduce",
            tag,
        )
        .await?;
        buf[recv_range].copy_from_slice(&received);
    }

    tracing::trace!(rank, tag, %op, count = buf.len(), "ring allreduce complete");
    Ok(buf)
}
