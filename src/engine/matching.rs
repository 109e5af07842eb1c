//! Matching state: posted receives, unexpected arrivals and in-flight
//! rendezvous transfers. Pure bookkeeping; the engine owns the I/O.

use std::collections::{HashMap, VecDeque};

use tokio::sync::oneshot;

use crate::error::{MeshError, Result};
use crate::types::{ContextId, Envelope, Rank, Source, Tag, TagSelector};

/// A delivered message, before it is decoded into the caller's elements.
#[derive(Debug)]
pub(crate) struct Delivery {
    pub src: Rank,
    pub tag: Tag,
    pub payload: Vec<u8>,
}

pub(crate) type Completion = oneshot::Sender<Result<Delivery>>;

/// A receive waiting for a matching message.
pub(crate) struct PostedRecv {
    pub id: u64,
    pub source: Source,
    pub tag: TagSelector,
    pub context: ContextId,
    /// Buffer capacity in bytes.
    pub capacity: usize,
    pub done: Completion,
}

impl PostedRecv {
    pub fn accepts(&self, envelope: &Envelope) -> bool {
        self.context == envelope.context
            && self.source.matches(envelope.source)
            && self.tag.matches(envelope.tag)
    }

    /// Complete with `payload`, or with `Truncated` if it does not fit.
    pub fn deliver(self, src: Rank, tag: Tag, payload: Vec<u8>) {
        let outcome = if payload.len() > self.capacity {
            Err(MeshError::Truncated {
                capacity: self.capacity,
                actual: payload.len(),
            })
        } else {
            Ok(Delivery { src, tag, payload })
        };
        let _ = self.done.send(outcome);
    }

    pub fn fail(self, err: MeshError) {
        let _ = self.done.send(Err(err));
    }
}

/// A message that arrived before any receive accepted it.
#[derive(Debug)]
pub(crate) enum Arrival {
    Eager { envelope: Envelope, payload: Vec<u8> },
    /// Only the announcement is held; the payload stays with the sender.
    Rendezvous {
        envelope: Envelope,
        seq: u64,
        len: usize,
    },
}

impl Arrival {
    pub fn envelope(&self) -> &Envelope {
        match self {
            Arrival::Eager { envelope, .. } | Arrival::Rendezvous { envelope, .. } => envelope,
        }
    }

    fn accepted_by(&self, source: Source, context: ContextId, tag: TagSelector) -> bool {
        let env = self.envelope();
        env.context == context && source.matches(env.source) && tag.matches(env.tag)
    }
}

/// Receiver side of a rendezvous transfer whose clear-to-send went out.
pub(crate) enum Cleared {
    Deliver { tag: Tag, recv: PostedRecv },
    /// The receive already failed with `Truncated`; drop the payload.
    Discard,
}

/// Sender side of a rendezvous transfer waiting for clear-to-send.
pub(crate) struct PendingSend {
    pub tag: Tag,
    pub payload: Vec<u8>,
    pub done: Completion,
}

#[derive(Default)]
pub(crate) struct MatchState {
    posted: VecDeque<PostedRecv>,
    unexpected: VecDeque<Arrival>,
    cleared: HashMap<(Rank, u64), Cleared>,
    awaiting_clear: HashMap<(Rank, u64), PendingSend>,
    pub closed: bool,
}

impl MatchState {
    /// Remove and return the earliest posted receive accepting the envelope.
    pub fn take_posted(&mut self, envelope: &Envelope) -> Option<PostedRecv> {
        let idx = self.posted.iter().position(|p| p.accepts(envelope))?;
        self.posted.remove(idx)
    }

    /// Remove the posted receive `id` if it is still waiting for a match.
    pub fn remove_posted(&mut self, id: u64) -> Option<PostedRecv> {
        let idx = self.posted.iter().position(|p| p.id == id)?;
        self.posted.remove(idx)
    }

    /// Remove and return the earliest unexpected arrival the receive accepts.
    pub fn take_unexpected(
        &mut self,
        source: Source,
        context: ContextId,
        tag: TagSelector,
    ) -> Option<Arrival> {
        let idx = self
            .unexpected
            .iter()
            .position(|a| a.accepted_by(source, context, tag))?;
        self.unexpected.remove(idx)
    }

    pub fn push_posted(&mut self, recv: PostedRecv) {
        self.posted.push_back(recv);
    }

    pub fn push_unexpected(&mut self, arrival: Arrival) {
        self.unexpected.push_back(arrival);
    }

    pub fn insert_cleared(&mut self, src: Rank, seq: u64, cleared: Cleared) {
        self.cleared.insert((src, seq), cleared);
    }

    pub fn take_cleared(&mut self, src: Rank, seq: u64) -> Option<Cleared> {
        self.cleared.remove(&(src, seq))
    }

    pub fn insert_pending_send(&mut self, dest: Rank, seq: u64, send: PendingSend) {
        self.awaiting_clear.insert((dest, seq), send);
    }

    /// Only the rank the request-to-send went to can clear it.
    pub fn take_pending_send(&mut self, src: Rank, seq: u64) -> Option<PendingSend> {
        self.awaiting_clear.remove(&(src, seq))
    }

    #[cfg(test)]
    pub fn posted_len(&self) -> usize {
        self.posted.len()
    }

    #[cfg(test)]
    pub fn unexpected_len(&self) -> usize {
        self.unexpected.len()
    }

    /// Fail every outstanding operation and refuse new ones.
    pub fn shut_down(&mut self) {
        self.closed = true;
        for recv in self.posted.drain(..) {
            recv.fail(MeshError::EngineShutdown);
        }
        for (_, cleared) in self.cleared.drain() {
            if let Cleared::Deliver { recv, .. } = cleared {
                recv.fail(MeshError::EngineShutdown);
            }
        }
        for (_, send) in self.awaiting_clear.drain() {
            let _ = send.done.send(Err(MeshError::EngineShutdown));
        }
        self.unexpected.clear();
    }
}
