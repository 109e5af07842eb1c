use crate::element::{Element, byte_len, decode_into, encode};
use crate::engine::{Delivery, Posted, ScopedRecv};
use crate::error::{MeshError, Result};
use crate::request::{Request, RequestKind};
use crate::types::{Rank, Source, Status, Tag, TagSelector};

use super::Communicator;

/// Await an engine completion.
async fn complete(posted: Posted) -> Result<Delivery> {
    posted
        .completion
        .await
        .map_err(|_| MeshError::EngineShutdown)?
}

impl Communicator {
    /// Send `data` to `dest`.
    ///
    /// Payloads below the eager threshold return once queued. Larger
    /// payloads return only after `dest` has posted a matching receive, so
    /// two ranks that both send large messages first will block forever.
    pub async fn send<T: Element>(&self, dest: Rank, tag: Tag, data: &[T]) -> Result<()> {
        self.check_rank(dest)?;
        let posted = self
            .engine()
            .post_send(dest, self.context(), tag, encode(data))?;
        complete(posted).await?;
        Ok(())
    }

    /// Receive a message matching `(source, tag)` into the front of `buf`.
    ///
    /// Fails with [`MeshError::Truncated`] if the message is larger than `buf`.
    pub async fn receive<T: Element>(
        &self,
        source: impl Into<Source>,
        tag: impl Into<TagSelector>,
        buf: &mut [T],
    ) -> Result<Status> {
        let mut incoming = self.scoped_receive::<T>(source.into(), tag.into(), buf.len())?;
        let delivery = incoming.complete().await?;
        let count = decode_into(&delivery.payload, buf)?;
        Ok(Status {
            source: delivery.src,
            tag: delivery.tag,
            count,
        })
    }

    /// Send to `dest` and receive from `source` as one exchange.
    ///
    /// The receive is posted before the send starts, so two ranks can
    /// exchange with each other this way under any protocol.
    pub async fn send_receive<T: Element>(
        &self,
        send: &[T],
        dest: Rank,
        send_tag: Tag,
        recv: &mut [T],
        source: impl Into<Source>,
        recv_tag: impl Into<TagSelector>,
    ) -> Result<Status> {
        self.check_rank(dest)?;
        let mut incoming = self.scoped_receive::<T>(source.into(), recv_tag.into(), recv.len())?;
        self.send(dest, send_tag, send).await?;
        let delivery = incoming.complete().await?;
        let count = decode_into(&delivery.payload, recv)?;
        Ok(Status {
            source: delivery.src,
            tag: delivery.tag,
            count,
        })
    }

    /// Start a send and return immediately.
    ///
    /// The send is registered before this returns. The request owns `data`
    /// until its completion has been observed.
    pub fn isend<T: Element>(&self, dest: Rank, tag: Tag, data: Vec<T>) -> Result<Request<T>> {
        self.check_rank(dest)?;
        let posted = self
            .engine()
            .post_send(dest, self.context(), tag, encode(&data))?;
        Ok(Request::new(posted, RequestKind::Send, data))
    }

    /// Post a receive into `buf` and return immediately.
    ///
    /// The receive is registered before this returns, so a blocking send
    /// issued afterwards by the peer always finds it.
    pub fn irecv<T: Element>(
        &self,
        source: impl Into<Source>,
        tag: impl Into<TagSelector>,
        buf: Vec<T>,
    ) -> Result<Request<T>> {
        let posted = self.post_receive::<T>(source.into(), tag.into(), buf.len())?;
        Ok(Request::new(posted, RequestKind::Receive, buf))
    }

    /// Post a receive that is withdrawn again if the caller stops waiting.
    fn scoped_receive<T: Element>(
        &self,
        source: Source,
        tag: TagSelector,
        capacity: usize,
    ) -> Result<ScopedRecv<'_>> {
        let posted = self.post_receive::<T>(source, tag, capacity)?;
        Ok(ScopedRecv::new(self.engine(), posted))
    }

    fn post_receive<T: Element>(
        &self,
        source: Source,
        tag: TagSelector,
        capacity: usize,
    ) -> Result<Posted> {
        if let Source::Rank(r) = source {
            self.check_rank(r)?;
        }
        self.engine()
            .post_recv(source, self.context(), tag, byte_len::<T>(capacity))
    }
}
