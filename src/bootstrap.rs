//! Getting a set of connected communicators.
//!
//! A launcher that starts one process per rank exports `RANKMESH_RANK`,
//! `RANKMESH_WORLD_SIZE` and `RANKMESH_PEERS` to each process. Without a
//! launcher, every rank can live in one process on the in-memory transport.

use std::future::Future;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use futures::future::try_join_all;

use crate::comm::Communicator;
use crate::config::MeshConfig;
use crate::error::{MeshError, Result};
use crate::transport::{MemoryTransport, QuicListener, QuicTransport};
use crate::types::Rank;

/// What a launcher tells one process about the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchEnv {
    pub rank: Rank,
    pub world_size: u32,
    /// Listening address of every rank, indexed by rank.
    pub peers: Vec<SocketAddr>,
}

impl LaunchEnv {
    /// Read the launcher variables of this process.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Whether this process was started by a launcher.
    pub fn is_present() -> bool {
        std::env::var_os("RANKMESH_RANK").is_some()
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| get(key).ok_or_else(|| MeshError::Launch(format!("{key} is not set")));
        let number = |key: &str| -> Result<u32> {
            let raw = var(key)?;
            raw.trim()
                .parse()
                .map_err(|_| MeshError::Launch(format!("{key}={raw:?} is not a rank number")))
        };

        let rank = number("RANKMESH_RANK")?;
        let world_size = number("RANKMESH_WORLD_SIZE")?;
        let peers = var("RANKMESH_PEERS")?
            .split(',')
            .map(|addr| {
                addr.trim().parse::<SocketAddr>().map_err(|_| {
                    MeshError::Launch(format!("RANKMESH_PEERS entry {addr:?} is not a socket address"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if world_size == 0 || peers.len() != world_size as usize {
            return Err(MeshError::Launch(format!(
                "world size {world_size} but {} peer addresses",
                peers.len()
            )));
        }
        if rank >= world_size {
            return Err(MeshError::Launch(format!(
                "rank {rank} outside world of {world_size}"
            )));
        }

        Ok(Self {
            rank,
            world_size,
            peers,
        })
    }
}

impl Communicator {
    /// `n` communicators in this process, joined by the in-memory transport.
    ///
    /// Uses [`MeshConfig::from_env`]. Must run inside a tokio runtime.
    pub fn local(n: u32) -> Vec<Communicator> {
        Self::local_with_config(n, MeshConfig::from_env())
    }

    pub fn local_with_config(n: u32, config: MeshConfig) -> Vec<Communicator> {
        MemoryTransport::mesh(n)
            .into_iter()
            .map(|t| Communicator::new(t, config.clone()))
            .collect()
    }

    /// `n` communicators in this process, joined over loopback QUIC.
    pub async fn local_quic(n: u32, config: MeshConfig) -> Result<Vec<Communicator>> {
        let listeners = (0..n)
            .map(|_| QuicListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))))
            .collect::<Result<Vec<_>>>()?;
        let peers: Vec<SocketAddr> = listeners.iter().map(QuicListener::local_addr).collect();

        let transports = try_join_all(
            listeners
                .into_iter()
                .enumerate()
                .map(|(rank, l)| QuicTransport::connect(l, rank as Rank, &peers, &config)),
        )
        .await?;

        Ok(transports
            .into_iter()
            .map(|t| Communicator::new(t, config.clone()))
            .collect())
    }

    /// Join the job described by a launcher over QUIC.
    pub async fn connect(env: &LaunchEnv, config: MeshConfig) -> Result<Communicator> {
        let addr = env
            .peers
            .get(env.rank as usize)
            .copied()
            .ok_or(MeshError::InvalidRank {
                rank: env.rank,
                size: env.world_size,
            })?;
        let bind = SocketAddr::new(
            if addr.is_ipv4() {
                Ipv4Addr::UNSPECIFIED.into()
            } else {
                Ipv6Addr::UNSPECIFIED.into()
            },
            addr.port(),
        );
        let listener = QuicListener::bind(bind)?;
        let transport = QuicTransport::connect(listener, env.rank, &env.peers, &config).await?;
        tracing::info!(rank = env.rank, world_size = env.world_size, %addr, "joined job");
        Ok(Communicator::new(transport, config))
    }
}

/// Run `body` on every rank of `comms`, each on its own task, and collect
/// the results in rank order.
pub async fn spawn_ranks<F, Fut, R>(comms: Vec<Communicator>, body: F) -> Result<Vec<R>>
where
    F: Fn(Communicator) -> Fut,
    Fut: Future<Output = Result<R>> + Send + 'static,
    R: Send + 'static,
{
    let handles: Vec<_> = comms
        .into_iter()
        .map(|comm| tokio::spawn(body(comm)))
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (rank, handle) in handles.into_iter().enumerate() {
        let outcome = handle
            .await
            .map_err(|e| MeshError::transport_with_source(format!("rank {rank} task panicked"), e))?;
        results.push(outcome?);
    }
    Ok(results)
}

/// Run `body` for this process's share of the job.
///
/// Under a launcher, joins the job over QUIC and runs `body` once.
/// Otherwise simulates `RANKMESH_WORLD_SIZE` ranks (or `default_size`) in
/// this process on the in-memory transport.
pub async fn launch<F, Fut, R>(default_size: u32, body: F) -> Result<Vec<R>>
where
    F: Fn(Communicator) -> Fut,
    Fut: Future<Output = Result<R>> + Send + 'static,
    R: Send + 'static,
{
    let config = MeshConfig::from_env();
    if LaunchEnv::is_present() {
        let env = LaunchEnv::from_env()?;
        let comm = Communicator::connect(&env, config).await?;
        return Ok(vec![body(comm).await?]);
    }

    let size = std::env::var("RANKMESH_WORLD_SIZE")
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .filter(|&n: &u32| n > 0)
        .unwrap_or(default_size);
    tracing::debug!(size, "simulating ranks in process");
    spawn_ranks(Communicator::local_with_config(size, config), body).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_launch_env_parses() {
        let env = LaunchEnv::from_lookup(lookup(&[
            ("RANKMESH_RANK", "1"),
            ("RANKMESH_WORLD_SIZE", "2"),
            ("RANKMESH_PEERS", "127.0.0.1:7000, 127.0.0.1:7001"),
        ]))
        .unwrap();
        assert_eq!(env.rank, 1);
        assert_eq!(env.world_size, 2);
        assert_eq!(env.peers[1], "127.0.0.1:7001".parse::<std::net::SocketAddr>().unwrap());
    }

    #[test]
    fn test_launch_env_missing_var() {
        let err = LaunchEnv::from_lookup(lookup(&[("RANKMESH_RANK", "0")])).unwrap_err();
        assert!(matches!(err, MeshError::Launch(msg) if msg.contains("RANKMESH_WORLD_SIZE")));
    }

    #[test]
    fn test_launch_env_rank_out_of_range() {
        let err = LaunchEnv::from_lookup(lookup(&[
            ("RANKMESH_RANK", "2"),
            ("RANKMESH_WORLD_SIZE", "2"),
            ("RANKMESH_PEERS", "127.0.0.1:7000,127.0.0.1:7001"),
        ]))
        .unwrap_err();
        assert!(matches!(err, MeshError::Launch(_)));
    }

    #[test]
    fn test_launch_env_peer_count_mismatch() {
        let err = LaunchEnv::from_lookup(lookup(&[
            ("RANKMESH_RANK", "0"),
            ("RANKMESH_WORLD_SIZE", "3"),
            ("RANKMESH_PEERS", "127.0.0.1:7000,127.0.0.1:7001"),
        ]))
        .unwrap_err();
        assert!(matches!(err, MeshError::Launch(_)));
    }

    #[test]
    fn test_launch_env_bad_address() {
        let err = LaunchEnv::from_lookup(lookup(&[
            ("RANKMESH_RANK", "0"),
            ("RANKMESH_WORLD_SIZE", "1"),
            ("RANKMESH_PEERS", "not-an-address"),
        ]))
        .unwrap_err();
        assert!(matches!(err, MeshError::Launch(_)));
    }

    #[tokio::test]
    async fn test_spawn_ranks_in_rank_order() {
        let ranks = spawn_ranks(Communicator::local(3), |comm| async move { Ok(comm.rank()) })
            .await
            .unwrap();
        assert_eq!(ranks, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_local_quic_exchange() {
        let comms = Communicator::local_quic(2, MeshConfig::default()).await.unwrap();
        let out = spawn_ranks(comms, |comm| async move {
            let partner = 1 - comm.rank();
            let mut buf = [0u32; 1];
            let status = comm
                .send_receive(&[comm.rank() + 10], partner, 0, &mut buf, partner, 0)
                .await?;
            assert_eq!(status.source, partner);
            comm.finalize().await?;
            Ok(buf[0])
        })
        .await
        .unwrap();
        assert_eq!(out, vec![11, 10]);
    }
}
