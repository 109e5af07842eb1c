mod allreduce;
mod barrier;
mod broadcast;
mod gather;
mod helpers;
mod partition;
mod reduce;
mod scatter;

pub(crate) use allreduce::all_reduce;
pub(crate) use barrier::barrier;
pub(crate) use broadcast::tree_broadcast;
pub(crate) use gather::{gather, gatherv};
pub use partition::Partition;
pub(crate) use reduce::tree_reduce;
pub(crate) use scatter::{scatter, scatterv};
