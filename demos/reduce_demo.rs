//! Each rank draws a value in `0..100`; rank 0 learns their sum and maximum.
//!
//! ```bash
//! cargo run --example reduce_demo
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use rankmesh::ReduceOp;
use tracing_subscriber::EnvFilter;

/// A value in `0..100` that differs between ranks and runs.
fn local_value(rank: u32) -> i32 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    let mixed = (nanos ^ (rank as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_mul(0xBF58_476D_1CE4_E5B9);
    ((mixed >> 33) % 100) as i32
}

#[tokio::main]
async fn main() -> rankmesh::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    rankmesh::launch(4, |comm| async move {
        let rank = comm.rank();
        let local = local_value(rank);
        println!("[Rank {rank}] My local value: {local}");

        let sum = comm.reduce(0, &[local], ReduceOp::Sum).await?;
        let max = comm.reduce(0, &[local], ReduceOp::Max).await?;

        if let (Some(sum), Some(max)) = (sum, max) {
            println!("--------------------------------");
            println!("[Rank 0] Total Sum: {}", sum[0]);
            println!("[Rank 0] Global Max: {}", max[0]);
            println!("--------------------------------");
        }
        comm.finalize().await
    })
    .await?;
    Ok(())
}
