//! Scatter a vector, double every element in parallel, gather it back.
//!
//! The element count must divide evenly by the number of ranks.
//!
//! ```bash
//! cargo run --example vector_multiply
//! ```

use rankmesh::MeshError;
use tracing_subscriber::EnvFilter;

const N: usize = 1000;

#[tokio::main]
async fn main() -> rankmesh::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    rankmesh::launch(4, |comm| async move {
        let size = comm.size() as usize;
        if N % size != 0 {
            return Err(MeshError::WorldSizeMismatch {
                operation: "vector_multiply",
                expected: format!("a divisor of {N}"),
                actual: comm.size(),
            });
        }
        let per_rank = N / size;
        let is_root = comm.rank() == 0;

        let mut global: Vec<i32> = if is_root {
            println!("[Master] Initialized vector with {N} elements.");
            (0..N as i32).collect()
        } else {
            Vec::new()
        };

        let mut local = vec![0i32; per_rank];
        comm.scatter(0, is_root.then_some(global.as_slice()), &mut local)
            .await?;
        println!(
            "[Rank {}] Received {per_rank} elements. First element is {}. Processing...",
            comm.rank(),
            local[0]
        );

        for x in &mut local {
            *x *= 2;
        }

        comm.gather(0, &local, is_root.then_some(global.as_mut_slice()))
            .await?;

        if is_root {
            println!("[Master] All data collected.");
            println!("Verification:");
            println!("  Index 0:   Expected 0,    Got {}", global[0]);
            println!("  Index {per_rank}: Expected {}, Got {}", 2 * per_rank, global[per_rank]);
            println!("  Index {}: Expected {}, Got {}", N - 1, 2 * (N - 1), global[N - 1]);
        }
        comm.finalize().await
    })
    .await?;
    Ok(())
}
