use crate::collective::{self, Partition};
use crate::element::Element;
use crate::error::Result;
use crate::reduce::Reducible;
use crate::types::{Rank, ReduceOp};

use super::Communicator;

/// Group operations. Every rank of the communicator must make the same
/// sequence of collective calls with the same root and compatible lengths;
/// each call is matched with its counterparts by call order, never by
/// timing.
impl Communicator {
    /// Block until every rank has entered the barrier.
    pub async fn barrier(&self) -> Result<()> {
        let tag = self.next_collective_tag();
        tracing::debug!(rank = self.rank(), tag, "barrier");
        collective::barrier(self, tag).await
    }

    /// Copy root's `buf` into `buf` on every rank.
    ///
    /// All ranks pass buffers of the same length.
    pub async fn broadcast<T: Element>(&self, root: Rank, buf: &mut [T]) -> Result<()> {
        self.check_rank(root)?;
        let tag = self.next_collective_tag();
        collective::tree_broadcast(self, buf, root, tag).await
    }

    /// Hand rank `i` the `i`-th `recv.len()`-element chunk of root's `send`.
    ///
    /// Only root passes `send`, holding `recv.len() * size()` elements.
    pub async fn scatter<T: Element>(
        &self,
        root: Rank,
        send: Option<&[T]>,
        recv: &mut [T],
    ) -> Result<()> {
        self.check_rank(root)?;
        let tag = self.next_collective_tag();
        collective::scatter(self, send, recv, root, tag).await
    }

    /// Scatter with per-rank counts and displacements.
    ///
    /// Returns how many elements landed at the front of `recv`.
    pub async fn scatterv<T: Element>(
        &self,
        root: Rank,
        send: Option<(&[T], &Partition)>,
        recv: &mut [T],
    ) -> Result<usize> {
        self.check_rank(root)?;
        let tag = self.next_collective_tag();
        collective::scatterv(self, send, recv, root, tag).await
    }

    /// Concatenate every rank's `send` into root's `recv`, in rank order.
    pub async fn gather<T: Element>(
        &self,
        root: Rank,
        send: &[T],
        recv: Option<&mut [T]>,
    ) -> Result<()> {
        self.check_rank(root)?;
        let tag = self.next_collective_tag();
        collective::gather(self, send, recv, root, tag).await
    }

    /// Gather with per-rank counts and displacements.
    pub async fn gatherv<T: Element>(
        &self,
        root: Rank,
        send: &[T],
        recv: Option<(&mut [T], &Partition)>,
    ) -> Result<()> {
        self.check_rank(root)?;
        let tag = self.next_collective_tag();
        collective::gatherv(self, send, recv, root, tag).await
    }

    /// Combine every rank's `send` element-wise with `op` at root.
    ///
    /// Returns `Some` on root and `None` everywhere else.
    pub async fn reduce<T: Reducible>(
        &self,
        root: Rank,
        send: &[T],
        op: ReduceOp,
    ) -> Result<Option<Vec<T>>> {
        self.check_rank(root)?;
        let tag = self.next_collective_tag();
        collective::tree_reduce(self, send, op, root, tag).await
    }

    /// Like [`reduce`](Self::reduce), with the result delivered to every rank.
    pub async fn all_reduce<T: Reducible>(&self, send: &[T], op: ReduceOp) -> Result<Vec<T>> {
        let tag = self.next_collective_tag();
        collective::all_reduce(self, send, op, tag).await
    }
}
