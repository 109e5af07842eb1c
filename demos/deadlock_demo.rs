//! Two ranks both send a large message before receiving.
//!
//! 10 000 `i32`s (40 000 bytes) exceed the default eager threshold, so each
//! send waits for the peer's matching receive, which is never posted. A
//! watchdog reports the hang instead of letting the program sit forever.
//!
//! ```bash
//! cargo run --example deadlock_demo
//! RANKMESH_WATCHDOG_SECS=10 cargo run --example deadlock_demo
//! ```

use std::time::Duration;

use tracing_subscriber::EnvFilter;

const N: usize = 10_000;

fn watchdog() -> Duration {
    let secs = std::env::var("RANKMESH_WATCHDOG_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3);
    Duration::from_secs(secs)
}

#[tokio::main]
async fn main() -> rankmesh::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let outcomes = rankmesh::launch(2, |comm| async move {
        comm.require_size(2, "deadlock_demo")?;
        let rank = comm.rank();
        let peer = 1 - rank;
        let send_buf = vec![rank as i32 + 1; N];
        let mut recv_buf = vec![0i32; N];

        let exchange = async {
            println!("[Rank {rank}] Attempting to SEND to rank {peer}...");
            comm.send(peer, 0, &send_buf).await?;
            println!("[Rank {rank}] Send passed! Attempting to RECV...");
            comm.receive(peer, 0, &mut recv_buf).await?;
            rankmesh::Result::Ok(())
        };

        let outcome = tokio::time::timeout(watchdog(), exchange).await;
        match outcome {
            Ok(result) => {
                result?;
                println!("[Rank {rank}] Exchange complete. Received value: {}", recv_buf[0]);
                comm.finalize().await?;
                rankmesh::Result::Ok(false)
            }
            Err(_) => {
                println!(
                    "[Rank {rank}] Watchdog: still blocked in send after {:?}. Deadlock.",
                    watchdog()
                );
                Ok(true)
            }
        }
    })
    .await?;

    if outcomes.iter().any(|&hung| hung) {
        println!("Both ranks sent first with blocking sends; neither reached its receive.");
    }
    Ok(())
}
