use crate::collective::helpers::{CollectiveTag, collective_recv, collective_send};
use crate::comm::Communicator;
use crate::error::Result;
use crate::reduce::{Reducible, reduce_slice};
use crate::types::{Rank, ReduceOp};

/// Tree reduce: combine every rank's `send` element-wise into root.
///
/// Uses a binomial tree with O(log N) steps. Handles non-power-of-2 world
/// sizes by first folding excess ranks into the lower power-of-2 set. The
/// combination order depends only on world size and root, so repeated
/// float reductions give bit-identical results.
///
/// Returns `Some(result)` on root and `None` elsewhere. Every rank must
/// pass the same number of elements.
pub(crate) async fn tree_reduce<T: Reducible>(
    comm: &Communicator,
    send: &[T],
    op: ReduceOp,
    root: Rank,
    tag: CollectiveTag,
) -> Result<Option<Vec<T>>> {
    let world = comm.size() as usize;
    let rank = comm.rank() as usize;
    let root_idx = root as usize;
    let count = send.len();

    let mut buf = send.to_vec();

    if world <= 1 {
        return Ok(Some(buf));
    }

    let vrank = (rank + world - root_idx) % world;
    let real = |v: usize| -> Rank { ((v + root_idx) % world) as Rank };

    let p2 = if world.is_power_of_two() {
        world
    } else {
        world.next_power_of_two() >> 1
    };
    let excess = world - p2;

    if vrank < excess {
        let received = collective_recv::<T>(comm, real(vrank + p2), count, "reduce", tag).await?;
        reduce_slice(&mut buf, &received, op)?;
    } else if vrank >= p2 {
        collective_send(comm, real(vrank - p2), &buf, "reduce", tag).await?;
        return Ok(None);
    }

    for round in 0..p2.trailing_zeros() {
        let mask = 1usize << round;
        let partner = vrank ^ mask;
        if vrank & mask != 0 {
            collective_send(comm, real(partner), &buf, "reduce", tag).await?;
            return Ok(None);
        }
        let received = collective_recv::<T>(comm, real(partner), count, "reduce", tag).await?;
        reduce_slice(&mut buf, &received, op)?;
    }

    tracing::trace!(rank, tag, %op, count, "reduce complete at root");
    Ok(Some(buf))
}
