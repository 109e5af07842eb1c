//! Ranks 0 and 1 post a receive and a send to each other, then wait for
//! both at once. Other ranks only take part in finalization.
//!
//! ```bash
//! cargo run --example waitall_demo
//! ```

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> rankmesh::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    rankmesh::launch(2, |comm| async move {
        comm.require_min_size(2, "waitall_demo")?;
        let rank = comm.rank();
        if rank <= 1 {
            let send_val = rank as i32 + 1000;
            let partner = 1 - rank;

            println!("[Rank {rank}] Posting irecv from rank {partner}...");
            let recv = comm.irecv(partner, 0, vec![0i32; 1])?;
            println!("[Rank {rank}] Posting isend to rank {partner}...");
            let send = comm.isend(partner, 0, vec![send_val])?;

            println!("[Rank {rank}] Operations active. Waiting for all requests to complete...");
            let mut reqs = vec![recv, send];
            rankmesh::wait_all(&mut reqs).await?;

            let mut reqs = reqs.into_iter();
            let received = match reqs.next() {
                Some(req) => req.into_buffer()?[0],
                None => 0,
            };
            println!("[Rank {rank}] Exchange done. Sent: {send_val}, Received: {received}");
        }
        comm.finalize().await
    })
    .await?;
    Ok(())
}
