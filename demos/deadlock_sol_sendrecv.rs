//! Break the send-send cycle with a combined exchange that posts its
//! receive before sending.
//!
//! ```bash
//! cargo run --example deadlock_sol_sendrecv
//! ```

use tracing_subscriber::EnvFilter;

const N: usize = 10_000;

#[tokio::main]
async fn main() -> rankmesh::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    rankmesh::launch(2, |comm| async move {
        comm.require_size(2, "deadlock_sol_sendrecv")?;
        let rank = comm.rank();
        let neighbor = 1 - rank;
        let send_buf = vec![rank as i32 + 1; N];
        let mut recv_buf = vec![0i32; N];

        println!("[Rank {rank}] Exchanging data with rank {neighbor} using send_receive...");
        comm.send_receive(&send_buf, neighbor, 0, &mut recv_buf, neighbor, 0)
            .await?;

        println!("[Rank {rank}] Exchange complete. Received value: {}", recv_buf[0]);
        comm.finalize().await
    })
    .await?;
    Ok(())
}
