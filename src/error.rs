use crate::types::Rank;

pub type Result<T> = std::result::Result<T, MeshError>;

#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("invalid rank {rank}: communicator size is {size}")]
    InvalidRank { rank: Rank, size: u32 },

    #[error("{operation} requires {expected} ranks, communicator has {actual}")]
    WorldSizeMismatch {
        operation: &'static str,
        expected: String,
        actual: u32,
    },

    #[error("message truncated: receive buffer holds {capacity} bytes, message has {actual}")]
    Truncated { capacity: usize, actual: usize },

    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("invalid data layout for {operation}: {reason}")]
    InvalidLayout {
        operation: &'static str,
        reason: String,
    },

    #[error("request {id} already completed")]
    RequestAlreadyCompleted { id: u64 },

    #[error("request {id} is still active")]
    RequestStillActive { id: u64 },

    #[error("context {context} is already used by this communicator")]
    ContextInUse { context: u32 },

    #[error("peer {rank} disconnected unexpectedly")]
    PeerDisconnected { rank: Rank },

    #[error("rank {rank} not found in mesh")]
    UnknownPeer { rank: Rank },

    #[error("protocol version mismatch: local={local}, remote={remote}")]
    ProtocolMismatch { local: u16, remote: u16 },

    #[error("frame encode failed: {0}")]
    EncodeFailed(String),

    #[error("frame decode failed: {0}")]
    DecodeFailed(String),

    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("TLS configuration error: {0}")]
    Tls(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{operation} failed at rank {rank}: {reason}")]
    CollectiveFailed {
        operation: &'static str,
        rank: Rank,
        reason: String,
    },

    #[error("matching engine has shut down")]
    EngineShutdown,

    #[error("invalid launch environment: {0}")]
    Launch(String),
}

impl MeshError {
    /// Create a `Transport` error with just a message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a `Transport` error with a message and a source error.
    pub fn transport_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Wrap a peer-level failure as a collective failure naming the operation.
    pub(crate) fn collective(operation: &'static str, rank: Rank, err: MeshError) -> Self {
        match err {
            // Local, caller-caused errors surface unchanged.
            e @ (MeshError::Truncated { .. }
            | MeshError::BufferSizeMismatch { .. }
            | MeshError::InvalidLayout { .. }
            | MeshError::InvalidRank { .. }) => e,
            other => MeshError::CollectiveFailed {
                operation,
                rank,
                reason: other.to_string(),
            },
        }
    }
}
