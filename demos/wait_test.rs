//! Overlap local work with communication by polling a request.
//!
//! Rank 0 posts a receive and keeps working until `test` reports
//! completion; rank 1 sleeps three seconds before sending. Each rank runs
//! on its own OS thread through the blocking `SyncCommunicator`.
//!
//! ```bash
//! cargo run --example wait_test
//! ```

use std::thread;
use std::time::Duration;

use rankmesh::{LaunchEnv, MeshConfig, SyncCommunicator};
use tracing_subscriber::EnvFilter;

fn run(comm: SyncCommunicator) -> rankmesh::Result<()> {
    comm.require_size(2, "wait_test")?;
    match comm.rank() {
        0 => {
            println!("[Rank 0] Posting irecv...");
            let mut req = comm.irecv(1, 0, vec![0i32; 1])?;
            let mut work_counter = 0;
            while req.test()?.is_none() {
                work_counter += 1;
                println!("[Rank 0] Data not ready. Doing local work step {work_counter}...");
                thread::sleep(Duration::from_secs(1));
            }
            let value = req.into_buffer()?[0];
            println!("[Rank 0] Data arrived! Received value: {value}");
        }
        _ => {
            println!("[Rank 1] Sleeping for 3 seconds before sending...");
            thread::sleep(Duration::from_secs(3));
            println!("[Rank 1] Sending now...");
            comm.send(0, 0, &[999i32])?;
        }
    }
    comm.finalize()
}

fn main() -> rankmesh::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config = MeshConfig::from_env();
    if LaunchEnv::is_present() {
        let env = LaunchEnv::from_env()?;
        return run(SyncCommunicator::connect(&env, config)?);
    }

    let handles: Vec<_> = SyncCommunicator::local(2, config)?
        .into_iter()
        .map(|comm| thread::spawn(move || run(comm)))
        .collect();
    for handle in handles {
        handle
            .join()
            .map_err(|_| rankmesh::MeshError::transport("rank thread panicked"))??;
    }
    Ok(())
}
