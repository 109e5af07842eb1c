//! Break the send-send cycle with a non-blocking send: start the send,
//! receive, then wait for the send.
//!
//! ```bash
//! cargo run --example deadlock_sol_isend
//! ```

use tracing_subscriber::EnvFilter;

const N: usize = 10_000;

#[tokio::main]
async fn main() -> rankmesh::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    rankmesh::launch(2, |comm| async move {
        comm.require_size(2, "deadlock_sol_isend")?;
        let rank = comm.rank();
        let dest = 1 - rank;
        let mut recv_buf = vec![0i32; N];

        println!("[Rank {rank}] Initiating isend to rank {dest}...");
        let mut req = comm.isend(dest, 0, vec![rank as i32 + 1; N])?;

        println!("[Rank {rank}] Entering receive...");
        comm.receive(dest, 0, &mut recv_buf).await?;

        println!("[Rank {rank}] Waiting for isend to complete...");
        req.wait().await?;

        println!("[Rank {rank}] Exchange complete. Received value: {}", recv_buf[0]);
        comm.finalize().await
    })
    .await?;
    Ok(())
}
