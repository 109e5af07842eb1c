pub mod bootstrap;
pub mod collective;
mod comm;
pub mod config;
mod element;
mod engine;
pub mod error;
pub mod protocol;
pub mod reduce;
pub mod request;
mod sync_client;
pub mod transport;
pub mod types;

pub use bootstrap::{LaunchEnv, launch, spawn_ranks};
pub use collective::Partition;
pub use comm::Communicator;
pub use config::MeshConfig;
pub use element::Element;
pub use error::{MeshError, Result};
pub use reduce::Reducible;
pub use request::{Request, RequestKind, RequestState, wait_all};
pub use sync_client::SyncCommunicator;
pub use transport::{MemoryTransport, QuicListener, QuicTransport, Transport};
pub use types::{
    ContextId, DataType, Envelope, Protocol, Rank, ReduceOp, Source, Status, Tag, TagSelector,
};
