use rankmesh::MeshError;

use super::helpers::{rendezvous_only, run_collective, run_collective_with};

async fn check_broadcast(world: u32, root: u32) {
    run_collective(world, move |comm| async move {
        let mut buf = if comm.rank() == root {
            vec![7i64, -3, 999, 42]
        } else {
            vec![0i64; 4]
        };
        comm.broadcast(root, &mut buf).await.unwrap();
        assert_eq!(buf, vec![7, -3, 999, 42], "rank {} broadcast mismatch", comm.rank());
    })
    .await;
}

#[tokio::test]
async fn test_broadcast_flat_3_nodes() {
    check_broadcast(3, 0).await;
}

#[tokio::test]
async fn test_broadcast_tree_4_nodes() {
    check_broadcast(4, 0).await;
}

#[tokio::test]
async fn test_broadcast_tree_7_nodes_nonzero_root() {
    check_broadcast(7, 5).await;
}

#[tokio::test]
async fn test_broadcast_single_rank() {
    check_broadcast(1, 0).await;
}

#[tokio::test]
async fn test_broadcast_large_rendezvous() {
    run_collective_with(5, rendezvous_only(), |comm| async move {
        let mut buf: Vec<f64> = if comm.rank() == 2 {
            (0..10_000).map(|i| i as f64 * 0.5).collect()
        } else {
            vec![0.0; 10_000]
        };
        comm.broadcast(2, &mut buf).await.unwrap();
        assert_eq!(buf[9_999], 4_999.5);
    })
    .await;
}

#[tokio::test]
async fn test_broadcast_invalid_root() {
    run_collective(2, |comm| async move {
        let mut buf = [0u8; 1];
        let err = comm.broadcast(2, &mut buf).await.unwrap_err();
        assert!(matches!(err, MeshError::InvalidRank { rank: 2, size: 2 }));
    })
    .await;
}

#[tokio::test]
async fn test_broadcast_length_mismatch() {
    run_collective(2, |comm| async move {
        if comm.rank() == 0 {
            comm.broadcast(0, &mut [1i32, 2, 3]).await.unwrap();
        } else {
            let mut short = [0i32; 2];
            let err = comm.broadcast(0, &mut short).await.unwrap_err();
            assert!(matches!(err, MeshError::Truncated { .. }));
        }
    })
    .await;
}
