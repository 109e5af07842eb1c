use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use super::helpers::{rendezvous_only, run_collective, run_collective_with};

#[tokio::test]
async fn test_barrier_single_rank() {
    run_collective(1, |comm| async move {
        comm.barrier().await.unwrap();
    })
    .await;
}

#[tokio::test]
async fn test_barrier_4_nodes() {
    run_collective(4, |comm| async move {
        comm.barrier().await.unwrap();
    })
    .await;
}

#[tokio::test]
async fn test_barrier_5_nodes_dissemination() {
    run_collective(5, |comm| async move {
        comm.barrier().await.unwrap();
    })
    .await;
}

#[tokio::test]
async fn test_barrier_2_nodes_double() {
    run_collective(2, |comm| async move {
        comm.barrier().await.unwrap();
        comm.barrier().await.unwrap();
    })
    .await;
}

#[tokio::test]
async fn test_barrier_rendezvous_7_nodes() {
    run_collective_with(7, rendezvous_only(), |comm| async move {
        for _ in 0..3 {
            comm.barrier().await.unwrap();
        }
    })
    .await;
}

/// No rank leaves before the slowest rank has arrived.
async fn check_nobody_leaves_early(world: u32) {
    let arrived = Arc::new(AtomicU32::new(0));
    run_collective(world, move |comm| {
        let arrived = Arc::clone(&arrived);
        async move {
            tokio::time::sleep(Duration::from_millis(comm.rank() as u64 * 20)).await;
            arrived.fetch_add(1, Ordering::SeqCst);
            comm.barrier().await.unwrap();
            assert_eq!(
                arrived.load(Ordering::SeqCst),
                world,
                "rank {} left the barrier early",
                comm.rank()
            );
        }
    })
    .await;
}

#[tokio::test]
async fn test_barrier_waits_for_slowest_two_phase() {
    check_nobody_leaves_early(4).await;
}

#[tokio::test]
async fn test_barrier_waits_for_slowest_dissemination() {
    check_nobody_leaves_early(6).await;
}
