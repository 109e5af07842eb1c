use futures::future::try_join_all;

use crate::collective::helpers::{
    CollectiveTag, ceil_log2, collective_send, exchange, post_recv,
};
use crate::comm::Communicator;
use crate::error::Result;

/// Threshold: use two-phase barrier for small worlds, dissemination for larger.
const DISSEMINATION_THRESHOLD: u32 = 5;

const NOTHING: &[u8] = &[];

/// Barrier: returns on a rank only after every rank has entered it.
///
/// Dispatches on world size:
/// - `two_phase_barrier` for world_size <= 4 (lower constant overhead)
/// - `dissemination_barrier` for world_size >= 5 (O(log N) rounds, no coordinator)
pub(crate) async fn barrier(comm: &Communicator, tag: CollectiveTag) -> Result<()> {
    let world = comm.size();
    if world <= 1 {
        return Ok(());
    }

    if world < DISSEMINATION_THRESHOLD {
        two_phase_barrier(comm, tag).await
    } else {
        dissemination_barrier(comm, tag).await
    }
}

/// Two-phase barrier: every rank reports to rank 0, rank 0 releases everyone.
async fn two_phase_barrier(comm: &Communicator, tag: CollectiveTag) -> Result<()> {
    let rank = comm.rank();
    let world = comm.size();

    if rank == 0 {
        let arrivals = (1..world)
            .map(|r| post_recv::<u8>(comm, r, 0, "barrier", tag))
            .collect::<Result<Vec<_>>>()?;
        try_join_all(arrivals.into_iter().map(|p| p.finish::<u8>("barrier"))).await?;

        tracing::trace!(rank, tag, "barrier: all ranks arrived");
        try_join_all((1..world).map(|r| collective_send(comm, r, NOTHING, "barrier", tag))).await?;
    } else {
        let release = post_recv::<u8>(comm, 0, 0, "barrier", tag)?;
        collective_send(comm, 0, NOTHING, "barrier", tag).await?;
        release.finish::<u8>("barrier").await?;
    }

    Ok(())
}

/// Dissemination barrier: O(log N) rounds, no single coordinator.
///
/// In round r, rank i signals rank `(i + 2^r) % N` and waits for rank
/// `(i - 2^r + N) % N`. After `ceil(log2(N))` rounds every rank has
/// transitively heard from every other rank.
async fn dissemination_barrier(comm: &Communicator, tag: CollectiveTag) -> Result<()> {
    let rank = comm.rank();
    let world = comm.size();

    for round in 0..ceil_log2(world) {
        let distance = 1u32 << round;
        let send_to = (rank + distance) % world;
        let recv_from = (rank + world - distance) % world;
        exchange(comm, send_to, NOTHING, recv_from, 0, "barrier", tag).await?;
    }

    Ok(())
}
