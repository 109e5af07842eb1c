use rankmesh::{Communicator, MeshConfig};

/// Helper: run a collective operation across N communicators concurrently.
pub async fn run_collective<F, Fut>(world_size: u32, f: F)
where
    F: Fn(Communicator) -> Fut,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    run_collective_with(world_size, MeshConfig::default(), f).await;
}

/// Same as [`run_collective`] with a custom engine configuration.
pub async fn run_collective_with<F, Fut>(world_size: u32, config: MeshConfig, f: F)
where
    F: Fn(Communicator) -> Fut,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let handles: Vec<_> = Communicator::local_with_config(world_size, config)
        .into_iter()
        .map(|c| tokio::spawn(f(c)))
        .collect();
    for h in handles {
        h.await.unwrap();
    }
}

/// Every message goes through the rendezvous handshake.
pub fn rendezvous_only() -> MeshConfig {
    MeshConfig::default().with_eager_threshold(0)
}
