//! Break the send-send cycle by ordering: rank 0 sends first, rank 1
//! receives first.
//!
//! ```bash
//! cargo run --example deadlock_sol_reorder
//! ```

use tracing_subscriber::EnvFilter;

const N: usize = 10_000;

#[tokio::main]
async fn main() -> rankmesh::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    rankmesh::launch(2, |comm| async move {
        comm.require_size(2, "deadlock_sol_reorder")?;
        let rank = comm.rank();
        let send_buf = vec![rank as i32 + 1; N];
        let mut recv_buf = vec![0i32; N];

        if rank == 0 {
            println!("[Rank 0] Sending to rank 1...");
            comm.send(1, 0, &send_buf).await?;
            println!("[Rank 0] Waiting to receive from rank 1...");
            comm.receive(1, 0, &mut recv_buf).await?;
        } else {
            println!("[Rank 1] Waiting to receive from rank 0...");
            comm.receive(0, 0, &mut recv_buf).await?;
            println!("[Rank 1] Sending to rank 0...");
            comm.send(0, 0, &send_buf).await?;
        }

        println!("[Rank {rank}] Exchange complete. Received value: {}", recv_buf[0]);
        comm.finalize().await
    })
    .await?;
    Ok(())
}
