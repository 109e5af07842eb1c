mod collectives;
mod p2p;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::config::MeshConfig;
use crate::engine::Engine;
use crate::error::{MeshError, Result};
use crate::transport::Transport;
use crate::types::{COLLECTIVE_CONTEXT_BIT, ContextId, Rank, Tag};

/// A fixed group of ranks sharing one message namespace.
///
/// Every rank holds its own `Communicator` value carrying its rank and the
/// group size; nothing about process identity is global. Messages only
/// match receives posted on a communicator with the same context.
pub struct Communicator {
    rank: Rank,
    size: u32,
    context: ContextId,
    engine: Arc<Engine>,
    /// Tag of the next collective call. Advances identically on every rank
    /// because collectives are called in the same order everywhere.
    collective_seq: AtomicU32,
}

impl Communicator {
    /// Create the world communicator (context 0) over `transport`.
    ///
    /// Spawns the matching engine's background tasks, so this must run
    /// inside a tokio runtime.
    pub fn new<T: Transport>(transport: T, config: MeshConfig) -> Self {
        let engine = Engine::start(Arc::new(transport), config);
        Self {
            rank: engine.rank(),
            size: engine.size(),
            context: 0,
            engine,
            collective_seq: AtomicU32::new(0),
        }
    }

    /// This process's rank within the communicator.
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Number of ranks in the communicator.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn config(&self) -> &MeshConfig {
        self.engine.config()
    }

    /// A communicator with the same ranks and a separate namespace.
    ///
    /// Every rank must pick the same `context`. Contexts with the high bit
    /// set carry collective traffic and cannot be chosen.
    pub fn duplicate(&self, context: ContextId) -> Result<Communicator> {
        if context == self.context || context & COLLECTIVE_CONTEXT_BIT != 0 {
            return Err(MeshError::ContextInUse { context });
        }
        tracing::debug!(rank = self.rank, from = self.context, to = context, "communicator duplicated");
        Ok(Communicator {
            rank: self.rank,
            size: self.size,
            context,
            engine: Arc::clone(&self.engine),
            collective_seq: AtomicU32::new(0),
        })
    }

    /// Fail unless the communicator has exactly `n` ranks.
    pub fn require_size(&self, n: u32, operation: &'static str) -> Result<()> {
        if self.size != n {
            return Err(MeshError::WorldSizeMismatch {
                operation,
                expected: format!("exactly {n}"),
                actual: self.size,
            });
        }
        Ok(())
    }

    /// Fail unless the communicator has at least `n` ranks.
    pub fn require_min_size(&self, n: u32, operation: &'static str) -> Result<()> {
        if self.size < n {
            return Err(MeshError::WorldSizeMismatch {
                operation,
                expected: format!("at least {n}"),
                actual: self.size,
            });
        }
        Ok(())
    }

    /// Synchronize, deliver everything still queued, then close the links.
    ///
    /// Collective: every rank calls it last. Communicators duplicated from
    /// this one stop working afterwards.
    pub async fn finalize(self) -> Result<()> {
        self.barrier().await?;
        self.engine.close().await?;
        tracing::debug!(rank = self.rank, "communicator finalized");
        Ok(())
    }

    pub(crate) fn check_rank(&self, rank: Rank) -> Result<()> {
        if rank >= self.size {
            return Err(MeshError::InvalidRank {
                rank,
                size: self.size,
            });
        }
        Ok(())
    }

    pub(crate) fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Context carrying this communicator's collective traffic.
    pub(crate) fn collective_context(&self) -> ContextId {
        self.context | COLLECTIVE_CONTEXT_BIT
    }

    pub(crate) fn next_collective_tag(&self) -> Tag {
        self.collective_seq.fetch_add(1, Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Communicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Communicator")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .field("context", &self.context)
            .finish()
    }
}
