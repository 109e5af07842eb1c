//! Rank 0 sends one value to rank 1; any other rank sits idle.
//!
//! ```bash
//! cargo run --example simple_p2p
//! ```

use tracing_subscriber::EnvFilter;

const PING_TAG: rankmesh::Tag = 0;

#[tokio::main]
async fn main() -> rankmesh::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    rankmesh::launch(4, |comm| async move {
        comm.require_min_size(2, "simple_p2p")?;
        match comm.rank() {
            0 => {
                let secret = 999i32;
                println!("[Rank 0] Preparing to send data: {secret}");
                comm.send(1, PING_TAG, &[secret]).await?;
                println!("[Rank 0] Data sent successfully.");
            }
            1 => {
                let mut received = [0i32; 1];
                comm.receive(0, PING_TAG, &mut received).await?;
                println!("[Rank 1] I received the secret data: {}", received[0]);
            }
            rank => println!("[Rank {rank}] I have nothing to do today."),
        }
        comm.finalize().await
    })
    .await?;
    Ok(())
}
