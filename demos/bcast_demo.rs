//! Rank 0 broadcasts a value to every rank.
//!
//! ```bash
//! cargo run --example bcast_demo
//! ```

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> rankmesh::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    rankmesh::launch(4, |comm| async move {
        let rank = comm.rank();
        let mut secret_code = [0i32; 1];
        if rank == 0 {
            secret_code[0] = 999;
            println!("[Rank 0] I have the secret code: 999. Broadcasting now...");
        }

        comm.broadcast(0, &mut secret_code).await?;
        println!("[Rank {rank}] My secret code is now: {}", secret_code[0]);
        comm.finalize().await
    })
    .await?;
    Ok(())
}
