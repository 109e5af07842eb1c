//! Every rank contributes `rank + 1` and every rank learns the total.
//!
//! ```bash
//! cargo run --example allreduce_demo
//! ```

use rankmesh::ReduceOp;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> rankmesh::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    rankmesh::launch(4, |comm| async move {
        let rank = comm.rank();
        let local = rank as i32 + 1;
        println!("[Rank {rank}] My local contribution: {local}");

        let total = comm.all_reduce(&[local], ReduceOp::Sum).await?[0];
        let share = local as f64 / total as f64 * 100.0;
        println!("[Rank {rank}] I know the total is {total}. My share is {share:.2}%");
        comm.finalize().await
    })
    .await?;
    Ok(())
}
