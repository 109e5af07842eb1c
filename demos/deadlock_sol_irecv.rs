//! Break the send-send cycle by posting a non-blocking receive before the
//! blocking send.
//!
//! ```bash
//! cargo run --example deadlock_sol_irecv
//! ```

use tracing_subscriber::EnvFilter;

const N: usize = 10_000;

#[tokio::main]
async fn main() -> rankmesh::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    rankmesh::launch(2, |comm| async move {
        comm.require_size(2, "deadlock_sol_irecv")?;
        let rank = comm.rank();
        let dest = 1 - rank;
        let send_buf = vec![rank as i32 + 1; N];

        println!("[Rank {rank}] Posting irecv (listening for rank {dest})...");
        let mut req = comm.irecv(dest, 0, vec![0i32; N])?;

        println!("[Rank {rank}] Calling blocking send...");
        comm.send(dest, 0, &send_buf).await?;

        println!("[Rank {rank}] Waiting for irecv to complete...");
        req.wait().await?;
        let recv_buf = req.into_buffer()?;

        println!("[Rank {rank}] Exchange complete. Received value: {}", recv_buf[0]);
        comm.finalize().await
    })
    .await?;
    Ok(())
}
