//! Like `vector_multiply`, for an element count that does not divide
//! evenly: the first `N % size` ranks take one extra element.
//!
//! ```bash
//! cargo run --example vector_multiply_irregular
//! ```

use rankmesh::Partition;
use tracing_subscriber::EnvFilter;

const N: usize = 1003;

#[tokio::main]
async fn main() -> rankmesh::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    rankmesh::launch(4, |comm| async move {
        let rank = comm.rank();
        let layout = Partition::even(N, comm.size());
        let is_root = rank == 0;

        let mut global: Vec<i32> = Vec::new();
        if is_root {
            global = (0..N as i32).collect();
            for r in 0..comm.size() {
                println!(
                    "[Master] Plan for rank {r}: count = {}, start_index = {}",
                    layout.count(r),
                    layout.range(r).start
                );
            }
        }

        // Every rank derives its own share from the same rule.
        let my_count = layout.count(rank);
        let mut local = vec![0i32; my_count];
        comm.scatterv(0, is_root.then_some((global.as_slice(), &layout)), &mut local)
            .await?;

        println!("[Rank {rank}] Received {my_count} items. Processing...");
        for x in &mut local {
            *x *= 2;
        }

        comm.gatherv(0, &local, is_root.then_some((global.as_mut_slice(), &layout)))
            .await?;

        if is_root {
            println!("[Master] Verification:");
            println!("  Item [0]    (rank 0): Expected 0, Got {}", global[0]);
            println!(
                "  Item [{}] (rank {}): Expected {}, Got {}",
                N - 1,
                comm.size() - 1,
                2 * (N - 1),
                global[N - 1]
            );
        }
        comm.finalize().await
    })
    .await?;
    Ok(())
}
