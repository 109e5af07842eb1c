//! Every rank reports its identity.
//!
//! ```bash
//! cargo run --example hello
//! RANKMESH_WORLD_SIZE=8 cargo run --example hello
//! ```

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> rankmesh::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    rankmesh::launch(4, |comm| async move {
        println!("Hello from rank {} of {}", comm.rank(), comm.size());
        comm.finalize().await
    })
    .await?;
    Ok(())
}
