//! Message matching engine.
//!
//! One engine serves every communicator built on a transport. It runs two
//! background tasks:
//!
//! - a **writer** that drains the outbound queue into the transport one
//!   frame at a time, so frames leave in the order they were queued;
//! - a **progress** task that decodes inbound frames and matches them
//!   against posted receives.
//!
//! Posting is synchronous: a send or receive is registered (and its
//! frames queued) before the posting call returns. Matching state lives
//! behind a `std::sync::Mutex` that is never held across an `.await`.

mod matching;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Notify, mpsc, oneshot};

use crate::config::MeshConfig;
use crate::error::{MeshError, Result};
use crate::protocol::{Packet, decode_packet, encode_packet};
use crate::transport::Transport;
use crate::types::{ContextId, Envelope, Protocol, Rank, Source, Tag, TagSelector};

pub(crate) use matching::Delivery;
use matching::{Arrival, Cleared, MatchState, PendingSend, PostedRecv};

enum Outbound {
    Frame { dest: Rank, bytes: Vec<u8> },
    /// Acknowledged once every frame queued before it reached the transport.
    Flush(oneshot::Sender<()>),
}

/// A registered operation and the channel its outcome arrives on.
pub(crate) struct Posted {
    pub id: u64,
    pub completion: oneshot::Receiver<Result<Delivery>>,
}

/// A receive posted on behalf of a blocking call.
///
/// Dropping it withdraws the receive if it has not matched yet, so a call
/// abandoned under `tokio::time::timeout` leaves nothing queued that could
/// swallow a later message. A receive that already matched is not undone.
pub(crate) struct ScopedRecv<'a> {
    engine: &'a Engine,
    posted: Posted,
}

impl<'a> ScopedRecv<'a> {
    pub fn new(engine: &'a Engine, posted: Posted) -> Self {
        Self { engine, posted }
    }

    pub async fn complete(&mut self) -> Result<Delivery> {
        (&mut self.posted.completion)
            .await
            .map_err(|_| MeshError::EngineShutdown)?
    }
}

impl Drop for ScopedRecv<'_> {
    fn drop(&mut self) {
        self.engine.withdraw(self.posted.id);
    }
}

pub(crate) struct Engine {
    rank: Rank,
    size: u32,
    config: MeshConfig,
    transport: Arc<dyn Transport>,
    state: Mutex<MatchState>,
    outbound: mpsc::UnboundedSender<Outbound>,
    next_id: AtomicU64,
    next_seq: AtomicU64,
    stop: Notify,
}

impl Engine {
    /// Create the engine and spawn its writer and progress tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(transport: Arc<dyn Transport>, config: MeshConfig) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Arc::new(Self {
            rank: transport.rank(),
            size: transport.world_size(),
            config,
            transport: Arc::clone(&transport),
            state: Mutex::new(MatchState::default()),
            outbound: tx,
            next_id: AtomicU64::new(0),
            next_seq: AtomicU64::new(0),
            stop: Notify::new(),
        });

        tokio::spawn(write_loop(transport, rx));
        tokio::spawn(progress_loop(Arc::clone(&engine)));

        tracing::debug!(
            rank = engine.rank,
            size = engine.size,
            eager_threshold = engine.config.eager_threshold,
            "engine started"
        );
        engine
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    fn lock(&self) -> Result<MutexGuard<'_, MatchState>> {
        let state = self.state.lock().map_err(|_| MeshError::EngineShutdown)?;
        if state.closed {
            return Err(MeshError::EngineShutdown);
        }
        Ok(state)
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn enqueue(&self, dest: Rank, packet: &Packet) -> Result<()> {
        let bytes = encode_packet(packet)?;
        tracing::trace!(rank = self.rank, dest, kind = ?packet.kind(), bytes = bytes.len(), "frame queued");
        self.outbound
            .send(Outbound::Frame { dest, bytes })
            .map_err(|_| MeshError::EngineShutdown)
    }

    /// Register a send of `payload` to `dest`.
    ///
    /// Eager sends complete immediately. Rendezvous sends complete once the
    /// destination's clear-to-send has arrived and the payload is queued.
    pub fn post_send(
        &self,
        dest: Rank,
        context: ContextId,
        tag: Tag,
        payload: Vec<u8>,
    ) -> Result<Posted> {
        let id = self.next_id();
        let (done, completion) = oneshot::channel();
        let bytes = payload.len();
        let protocol = self.config.protocol_for(bytes);
        let mut state = self.lock()?;

        match protocol {
            Protocol::Eager => {
                self.enqueue(
                    dest,
                    &Packet::Eager {
                        context,
                        tag,
                        payload,
                    },
                )?;
                let _ = done.send(Ok(Delivery {
                    src: self.rank,
                    tag,
                    payload: Vec::new(),
                }));
            }
            Protocol::Rendezvous => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                state.insert_pending_send(dest, seq, PendingSend { tag, payload, done });
                self.enqueue(
                    dest,
                    &Packet::RendezvousRequest {
                        context,
                        tag,
                        seq,
                        len: bytes as u64,
                    },
                )?;
            }
        }
        drop(state);

        tracing::debug!(rank = self.rank, id, dest, tag, context, bytes, %protocol, "send posted");
        Ok(Posted { id, completion })
    }

    /// Register a receive of at most `capacity` bytes.
    pub fn post_recv(
        &self,
        source: Source,
        context: ContextId,
        tag: TagSelector,
        capacity: usize,
    ) -> Result<Posted> {
        let id = self.next_id();
        let (done, completion) = oneshot::channel();
        let recv = PostedRecv {
            id,
            source,
            tag,
            context,
            capacity,
            done,
        };

        let mut state = self.lock()?;
        match state.take_unexpected(source, context, tag) {
            Some(Arrival::Eager { envelope, payload }) => {
                let Envelope { source: src, tag, .. } = envelope;
                tracing::debug!(rank = self.rank, id, src, tag, context, "receive matched queued eager message");
                recv.deliver(src, tag, payload);
            }
            Some(Arrival::Rendezvous { envelope, seq, len }) => {
                let Envelope { source: src, tag, .. } = envelope;
                tracing::debug!(rank = self.rank, id, src, tag, context, seq, "receive matched queued rendezvous request");
                self.clear(&mut state, recv, src, tag, seq, len)?;
            }
            None => {
                tracing::debug!(rank = self.rank, id, %source, %tag, context, capacity, "receive posted");
                state.push_posted(recv);
            }
        }
        Ok(Posted { id, completion })
    }

    /// Answer a matched request-to-send with clear-to-send.
    ///
    /// An oversized message fails the receive immediately; the sender is
    /// still cleared so its failure stays local to the receiver.
    fn clear(
        &self,
        state: &mut MatchState,
        recv: PostedRecv,
        src: Rank,
        tag: Tag,
        seq: u64,
        len: usize,
    ) -> Result<()> {
        let cleared = if len > recv.capacity {
            let capacity = recv.capacity;
            recv.fail(MeshError::Truncated {
                capacity,
                actual: len,
            });
            Cleared::Discard
        } else {
            Cleared::Deliver { tag, recv }
        };
        state.insert_cleared(src, seq, cleared);
        self.enqueue(src, &Packet::RendezvousClear { seq })
    }

    /// Remove receive `id` from the posted queue if nothing matched it yet.
    pub fn withdraw(&self, id: u64) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        let withdrawn = state.remove_posted(id).is_some();
        if withdrawn {
            tracing::debug!(rank = self.rank, id, "unmatched receive withdrawn");
        }
        withdrawn
    }

    fn envelope(&self, source: Rank, context: ContextId, tag: Tag) -> Envelope {
        Envelope {
            source,
            dest: self.rank,
            tag,
            context,
        }
    }

    fn on_frame(&self, src: Rank, frame: &[u8]) {
        let packet = match decode_packet(frame) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(rank = self.rank, src, error = %e, "discarding undecodable frame");
                return;
            }
        };
        tracing::trace!(rank = self.rank, src, kind = ?packet.kind(), bytes = frame.len(), "frame received");

        let mut state = match self.lock() {
            Ok(s) => s,
            Err(_) => return,
        };

        match packet {
            Packet::Eager {
                context,
                tag,
                payload,
            } => {
                let envelope = self.envelope(src, context, tag);
                match state.take_posted(&envelope) {
                    Some(recv) => {
                        tracing::debug!(rank = self.rank, id = recv.id, src, tag, context, "eager message matched");
                        recv.deliver(src, tag, payload);
                    }
                    None => {
                        tracing::debug!(rank = self.rank, src, tag, context, "eager message unexpected");
                        state.push_unexpected(Arrival::Eager { envelope, payload });
                    }
                }
            }
            Packet::RendezvousRequest {
                context,
                tag,
                seq,
                len,
            } => {
                let envelope = self.envelope(src, context, tag);
                match state.take_posted(&envelope) {
                    Some(recv) => {
                        tracing::debug!(rank = self.rank, id = recv.id, src, tag, context, seq, "rendezvous request matched");
                        if let Err(e) = self.clear(&mut state, recv, src, tag, seq, len as usize) {
                            tracing::error!(rank = self.rank, src, seq, error = %e, "failed to queue clear-to-send");
                        }
                    }
                    None => {
                        tracing::debug!(rank = self.rank, src, tag, context, seq, "rendezvous request unexpected");
                        state.push_unexpected(Arrival::Rendezvous {
                            envelope,
                            seq,
                            len: len as usize,
                        });
                    }
                }
            }
            Packet::RendezvousClear { seq } => match state.take_pending_send(src, seq) {
                Some(PendingSend { tag, payload, done }) => {
                    let outcome = self
                        .enqueue(src, &Packet::RendezvousData { seq, payload })
                        .map(|()| Delivery {
                            src: self.rank,
                            tag,
                            payload: Vec::new(),
                        });
                    tracing::debug!(rank = self.rank, dest = src, tag, seq, "rendezvous send cleared");
                    let _ = done.send(outcome);
                }
                None => {
                    tracing::warn!(rank = self.rank, src, seq, "clear-to-send for unknown transfer");
                }
            },
            Packet::RendezvousData { seq, payload } => match state.take_cleared(src, seq) {
                Some(Cleared::Deliver { tag, recv }) => {
                    tracing::debug!(rank = self.rank, id = recv.id, src, tag, seq, "rendezvous receive completed");
                    recv.deliver(src, tag, payload);
                }
                Some(Cleared::Discard) => {
                    tracing::debug!(rank = self.rank, src, seq, "dropped payload of truncated receive");
                }
                None => {
                    tracing::warn!(rank = self.rank, src, seq, "payload for unknown transfer");
                }
            },
            Packet::Hello { rank, .. } => {
                tracing::warn!(rank = self.rank, src, hello_rank = rank, "unexpected hello after mesh formation");
            }
        }
    }

    /// Wait until every frame queued so far has been handed to the transport.
    pub async fn flush(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.outbound
            .send(Outbound::Flush(tx))
            .map_err(|_| MeshError::EngineShutdown)?;
        rx.await.map_err(|_| MeshError::EngineShutdown)
    }

    /// Flush, close the transport, then stop matching.
    ///
    /// Operations still pending afterwards fail with `EngineShutdown`.
    pub async fn close(&self) -> Result<()> {
        self.flush().await?;
        self.transport.close().await?;
        self.stop.notify_one();
        if let Ok(mut state) = self.state.lock() {
            state.shut_down();
        }
        Ok(())
    }

    /// Numbers of posted receives and unexpected arrivals currently held.
    #[cfg(test)]
    pub fn queue_depths(&self) -> (usize, usize) {
        self.state
            .lock()
            .map(|s| (s.posted_len(), s.unexpected_len()))
            .unwrap_or((0, 0))
    }
}

async fn write_loop(transport: Arc<dyn Transport>, mut rx: mpsc::UnboundedReceiver<Outbound>) {
    let rank = transport.rank();
    while let Some(out) = rx.recv().await {
        match out {
            Outbound::Frame { dest, bytes } => {
                if let Err(e) = transport.send_frame(dest, &bytes).await {
                    tracing::error!(rank, dest, error = %e, "frame send failed");
                }
            }
            Outbound::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

async fn progress_loop(engine: Arc<Engine>) {
    loop {
        let next = tokio::select! {
            inbound = engine.transport.recv_frame() => inbound,
            _ = engine.stop.notified() => {
                tracing::debug!(rank = engine.rank, "progress loop stopped by close");
                return;
            }
        };
        match next {
            Ok(inbound) => engine.on_frame(inbound.src, &inbound.frame),
            Err(e) => {
                tracing::debug!(rank = engine.rank, error = %e, "progress loop stopped");
                if let Ok(mut state) = engine.state.lock() {
                    state.shut_down();
                }
                return;
            }
        }
    }
}
