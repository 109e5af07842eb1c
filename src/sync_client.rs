use crate::bootstrap::LaunchEnv;
use crate::collective::Partition;
use crate::comm::Communicator;
use crate::config::MeshConfig;
use crate::element::Element;
use crate::error::{MeshError, Result};
use crate::reduce::Reducible;
use crate::request::{self, Request};
use crate::transport::MemoryTransport;
use crate::types::{Rank, ReduceOp, Source, Status, Tag, TagSelector};

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .map_err(|e| MeshError::transport(format!("tokio runtime: {e}")))
}

/// Blocking wrapper around [`Communicator`].
///
/// Owns a `tokio::runtime::Runtime` and calls `block_on()` for each
/// operation, so one OS thread per rank can drive it like a C-style
/// message-passing program. The runtime's workers keep the engine moving
/// while the thread computes between calls.
pub struct SyncCommunicator {
    inner: Communicator,
    rt: tokio::runtime::Runtime,
}

impl SyncCommunicator {
    /// `n` ranks in this process on the in-memory transport, one runtime each.
    ///
    /// Move each value to its own thread.
    pub fn local(n: u32, config: MeshConfig) -> Result<Vec<Self>> {
        MemoryTransport::mesh(n)
            .into_iter()
            .map(|transport| {
                let rt = runtime()?;
                // The engine's tasks live on this rank's runtime.
                let inner = {
                    let _guard = rt.enter();
                    Communicator::new(transport, config.clone())
                };
                Ok(Self { inner, rt })
            })
            .collect()
    }

    /// Join a launcher-described job over QUIC.
    pub fn connect(env: &LaunchEnv, config: MeshConfig) -> Result<Self> {
        let rt = runtime()?;
        let inner = rt.block_on(Communicator::connect(env, config))?;
        Ok(Self { inner, rt })
    }

    pub fn rank(&self) -> Rank {
        self.inner.rank()
    }

    pub fn size(&self) -> u32 {
        self.inner.size()
    }

    /// The async communicator underneath.
    pub fn inner(&self) -> &Communicator {
        &self.inner
    }

    pub fn require_size(&self, n: u32, operation: &'static str) -> Result<()> {
        self.inner.require_size(n, operation)
    }

    pub fn send<T: Element>(&self, dest: Rank, tag: Tag, data: &[T]) -> Result<()> {
        self.rt.block_on(self.inner.send(dest, tag, data))
    }

    pub fn receive<T: Element>(
        &self,
        source: impl Into<Source>,
        tag: impl Into<TagSelector>,
        buf: &mut [T],
    ) -> Result<Status> {
        self.rt.block_on(self.inner.receive(source, tag, buf))
    }

    pub fn send_receive<T: Element>(
        &self,
        send: &[T],
        dest: Rank,
        send_tag: Tag,
        recv: &mut [T],
        source: impl Into<Source>,
        recv_tag: impl Into<TagSelector>,
    ) -> Result<Status> {
        self.rt.block_on(
            self.inner
                .send_receive(send, dest, send_tag, recv, source, recv_tag),
        )
    }

    pub fn isend<T: Element>(&self, dest: Rank, tag: Tag, data: Vec<T>) -> Result<Request<T>> {
        self.inner.isend(dest, tag, data)
    }

    pub fn irecv<T: Element>(
        &self,
        source: impl Into<Source>,
        tag: impl Into<TagSelector>,
        buf: Vec<T>,
    ) -> Result<Request<T>> {
        self.inner.irecv(source, tag, buf)
    }

    /// Block until `request` completes.
    pub fn wait<T: Element>(&self, request: &mut Request<T>) -> Result<Status> {
        self.rt.block_on(request.wait())
    }

    pub fn wait_all<T: Element>(&self, requests: &mut [Request<T>]) -> Result<Vec<Status>> {
        self.rt.block_on(request::wait_all(requests))
    }

    pub fn barrier(&self) -> Result<()> {
        self.rt.block_on(self.inner.barrier())
    }

    pub fn broadcast<T: Element>(&self, root: Rank, buf: &mut [T]) -> Result<()> {
        self.rt.block_on(self.inner.broadcast(root, buf))
    }

    pub fn scatter<T: Element>(&self, root: Rank, send: Option<&[T]>, recv: &mut [T]) -> Result<()> {
        self.rt.block_on(self.inner.scatter(root, send, recv))
    }

    pub fn scatterv<T: Element>(
        &self,
        root: Rank,
        send: Option<(&[T], &Partition)>,
        recv: &mut [T],
    ) -> Result<usize> {
        self.rt.block_on(self.inner.scatterv(root, send, recv))
    }

    pub fn gather<T: Element>(&self, root: Rank, send: &[T], recv: Option<&mut [T]>) -> Result<()> {
        self.rt.block_on(self.inner.gather(root, send, recv))
    }

    pub fn gatherv<T: Element>(
        &self,
        root: Rank,
        send: &[T],
        recv: Option<(&mut [T], &Partition)>,
    ) -> Result<()> {
        self.rt.block_on(self.inner.gatherv(root, send, recv))
    }

    pub fn reduce<T: Reducible>(&self, root: Rank, send: &[T], op: ReduceOp) -> Result<Option<Vec<T>>> {
        self.rt.block_on(self.inner.reduce(root, send, op))
    }

    pub fn all_reduce<T: Reducible>(&self, send: &[T], op: ReduceOp) -> Result<Vec<T>> {
        self.rt.block_on(self.inner.all_reduce(send, op))
    }

    /// Synchronize with every rank, flush, and shut the runtime down.
    pub fn finalize(self) -> Result<()> {
        let Self { inner, rt } = self;
        rt.block_on(inner.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_thread_per_rank_exchange() {
        let comms = SyncCommunicator::local(2, MeshConfig::default().with_eager_threshold(0)).unwrap();
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                thread::spawn(move || {
                    let partner = 1 - comm.rank();
                    let mut req = comm.irecv(partner, 0, vec![0i64; 4]).unwrap();
                    comm.send(partner, 0, &[comm.rank() as i64; 4]).unwrap();
                    comm.wait(&mut req).unwrap();
                    let got = req.into_buffer().unwrap();
                    comm.barrier().unwrap();
                    comm.finalize().unwrap();
                    got
                })
            })
            .collect();

        let results: Vec<Vec<i64>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results[0], vec![1; 4]);
        assert_eq!(results[1], vec![0; 4]);
    }

    #[test]
    fn test_test_polls_until_complete() {
        let comms = SyncCommunicator::local(2, MeshConfig::default()).unwrap();
        let mut it = comms.into_iter();
        let a = it.next().unwrap();
        let b = it.next().unwrap();

        let mut req = b.irecv(0, 3, vec![0u32; 1]).unwrap();
        assert!(req.test().unwrap().is_none());

        a.send(1, 3, &[999u32]).unwrap();
        let status = loop {
            if let Some(status) = req.test().unwrap() {
                break status;
            }
            thread::sleep(std::time::Duration::from_millis(1));
        };
        assert_eq!(status.count, 1);
        assert_eq!(req.into_buffer().unwrap(), vec![999]);
    }
}
