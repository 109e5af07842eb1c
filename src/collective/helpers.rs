use crate::comm::Communicator;
use crate::element::{Element, decode_into, decode_vec, encode};
use crate::engine::ScopedRecv;
use crate::error::{MeshError, Result};
use crate::types::{Rank, Source, Tag, TagSelector};

/// Tag identifying one collective call on the collective context.
pub(crate) type CollectiveTag = Tag;

/// Integer ceiling of log2(n). Returns 0 for n <= 1.
pub(crate) fn ceil_log2(n: u32) -> u32 {
    if n <= 1 {
        return 0;
    }
    u32::BITS - (n - 1).leading_zeros()
}

/// A collective receive that has been registered but not yet awaited.
///
/// Dropped unfinished, it withdraws the receive.
pub(crate) struct PendingRecv<'a> {
    src: Rank,
    count: usize,
    recv: ScopedRecv<'a>,
}

/// Register a receive of exactly `count` elements from `src`.
///
/// Collectives post every receive before starting the matching sends, so
/// they make progress under the rendezvous protocol too.
pub(crate) fn post_recv<'a, T: Element>(
    comm: &'a Communicator,
    src: Rank,
    count: usize,
    operation: &'static str,
    tag: CollectiveTag,
) -> Result<PendingRecv<'a>> {
    let posted = comm
        .engine()
        .post_recv(
            Source::Rank(src),
            comm.collective_context(),
            TagSelector::Tag(tag),
            count * T::SIZE,
        )
        .map_err(|e| MeshError::collective(operation, src, e))?;
    Ok(PendingRecv {
        src,
        count,
        recv: ScopedRecv::new(comm.engine(), posted),
    })
}

impl PendingRecv<'_> {
    /// Wait for the data. Anything but exactly `count` elements is an error.
    pub async fn finish<T: Element>(mut self, operation: &'static str) -> Result<Vec<T>> {
        let src = self.src;
        let delivery = self
            .recv
            .complete()
            .await
            .map_err(|e| MeshError::collective(operation, src, e))?;

        let expected = self.count * T::SIZE;
        if delivery.payload.len() != expected {
            return Err(MeshError::BufferSizeMismatch {
                expected,
                actual: delivery.payload.len(),
            });
        }
        decode_vec(&delivery.payload)
    }
}

/// Send elements to a peer, wrapping errors as `CollectiveFailed`.
pub(crate) async fn collective_send<T: Element>(
    comm: &Communicator,
    dest: Rank,
    data: &[T],
    operation: &'static str,
    tag: CollectiveTag,
) -> Result<()> {
    let posted = comm
        .engine()
        .post_send(dest, comm.collective_context(), tag, encode(data))
        .map_err(|e| MeshError::collective(operation, dest, e))?;
    posted
        .completion
        .await
        .map_err(|_| MeshError::collective(operation, dest, MeshError::EngineShutdown))?
        .map_err(|e| MeshError::collective(operation, dest, e))?;
    Ok(())
}

/// Receive exactly `count` elements from a peer.
pub(crate) async fn collective_recv<T: Element>(
    comm: &Communicator,
    src: Rank,
    count: usize,
    operation: &'static str,
    tag: CollectiveTag,
) -> Result<Vec<T>> {
    post_recv::<T>(comm, src, count, operation, tag)?
        .finish(operation)
        .await
}

/// Receive at most `buf.len()` elements from a peer into the front of
/// `buf`, returning how many arrived.
pub(crate) async fn collective_recv_into<T: Element>(
    comm: &Communicator,
    src: Rank,
    buf: &mut [T],
    operation: &'static str,
    tag: CollectiveTag,
) -> Result<usize> {
    let posted = comm
        .engine()
        .post_recv(
            Source::Rank(src),
            comm.collective_context(),
            TagSelector::Tag(tag),
            buf.len() * T::SIZE,
        )
        .map_err(|e| MeshError::collective(operation, src, e))?;
    let delivery = ScopedRecv::new(comm.engine(), posted)
        .complete()
        .await
        .map_err(|e| MeshError::collective(operation, src, e))?;
    decode_into(&delivery.payload, buf)
}

/// Check an argument that only the root supplies.
pub(crate) fn root_only<A>(
    comm: &Communicator,
    root: Rank,
    arg: Option<A>,
    operation: &'static str,
) -> Result<Option<A>> {
    let is_root = comm.rank() == root;
    match (&arg, is_root) {
        (None, true) => Err(MeshError::InvalidLayout {
            operation,
            reason: format!("root rank {root} must supply its buffer"),
        }),
        (Some(_), false) => Err(MeshError::InvalidLayout {
            operation,
            reason: format!("rank {} is not the root and must not supply a root buffer", comm.rank()),
        }),
        _ => Ok(arg),
    }
}

/// Send `data` to `dest` while receiving `count` elements from `src`.
///
/// The receive is posted first.
pub(crate) async fn exchange<T: Element>(
    comm: &Communicator,
    dest: Rank,
    data: &[T],
    src: Rank,
    count: usize,
    operation: &'static str,
    tag: CollectiveTag,
) -> Result<Vec<T>> {
    let incoming = post_recv::<T>(comm, src, count, operation, tag)?;
    let (sent, received) = tokio::join!(
        collective_send(comm, dest, data, operation, tag),
        incoming.finish::<T>(operation),
    );
    sent?;
    received
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceil_log2() {
        assert_eq!(ceil_log2(0), 0);
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(3), 2);
        assert_eq!(ceil_log2(4), 2);
        assert_eq!(ceil_log2(5), 3);
        assert_eq!(ceil_log2(8), 3);
        assert_eq!(ceil_log2(9), 4);
    }
}
