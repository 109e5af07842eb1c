//! Ranks finish uneven amounts of work, then meet at a barrier. Rank `r`
//! works for `2r + 1` seconds; nobody passes until the slowest arrives.
//!
//! ```bash
//! cargo run --example barrier_demo
//! ```

use std::time::{Duration, Instant};

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> rankmesh::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let start = Instant::now();
    rankmesh::launch(4, move |comm| async move {
        let rank = comm.rank();
        let work = rank as u64 * 2 + 1;
        println!("[Rank {rank}] I am working hard for {work} seconds...");
        tokio::time::sleep(Duration::from_secs(work)).await;

        println!(
            "[Rank {rank}] Work done at {:.1}s. Waiting at the barrier...",
            start.elapsed().as_secs_f64()
        );
        comm.barrier().await?;
        println!(
            "[Rank {rank}] I passed the barrier at {:.1}s! Moving to next phase.",
            start.elapsed().as_secs_f64()
        );
        comm.finalize().await
    })
    .await?;
    Ok(())
}
