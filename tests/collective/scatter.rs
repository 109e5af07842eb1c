use rankmesh::{MeshError, Partition};

use super::helpers::{rendezvous_only, run_collective, run_collective_with};

#[tokio::test]
async fn test_scatter_4_nodes() {
    run_collective(4, |comm| async move {
        let rank = comm.rank();
        let global: Vec<i32> = (0..1000).collect();
        let mut local = vec![0i32; 250];
        let send = (rank == 0).then_some(global.as_slice());
        comm.scatter(0, send, &mut local).await.unwrap();
        assert_eq!(local[0], rank as i32 * 250);
        assert_eq!(local[249], rank as i32 * 250 + 249);
    })
    .await;
}

#[tokio::test]
async fn test_scatter_nonzero_root_rendezvous() {
    run_collective_with(3, rendezvous_only(), |comm| async move {
        let rank = comm.rank();
        let global: Vec<u64> = (0..30).collect();
        let mut local = vec![0u64; 10];
        let send = (rank == 2).then_some(global.as_slice());
        comm.scatter(2, send, &mut local).await.unwrap();
        assert_eq!(local, (rank as u64 * 10..rank as u64 * 10 + 10).collect::<Vec<_>>());
    })
    .await;
}

#[tokio::test]
async fn test_scatter_root_buffer_wrong_length() {
    run_collective(1, |comm| async move {
        let mut local = [0i32; 3];
        let err = comm.scatter(0, Some(&[1, 2][..]), &mut local).await.unwrap_err();
        assert!(matches!(err, MeshError::InvalidLayout { operation: "scatter", .. }));
    })
    .await;
}

#[tokio::test]
async fn test_scatter_root_buffer_missing_or_misplaced() {
    run_collective(1, |comm| async move {
        let mut local = [0i32; 1];
        let err = comm.scatter::<i32>(0, None, &mut local).await.unwrap_err();
        assert!(matches!(err, MeshError::InvalidLayout { .. }));
    })
    .await;

    run_collective(2, |comm| async move {
        if comm.rank() == 1 {
            let mut local = [0i32; 1];
            let err = comm
                .scatter(0, Some(&[1, 2][..]), &mut local)
                .await
                .unwrap_err();
            assert!(matches!(err, MeshError::InvalidLayout { .. }));
        }
    })
    .await;
}

#[tokio::test]
async fn test_scatterv_irregular() {
    run_collective(4, |comm| async move {
        let rank = comm.rank();
        let layout = Partition::even(1003, comm.size());
        let global: Vec<i32> = (0..1003).collect();

        let mut local = vec![0i32; layout.count(rank)];
        let send = (rank == 0).then_some((global.as_slice(), &layout));
        let got = comm.scatterv(0, send, &mut local).await.unwrap();

        assert_eq!(got, layout.count(rank));
        assert_eq!(local[0], layout.range(rank).start as i32);
        if rank == 3 {
            assert_eq!(got, 250);
            assert_eq!(local[249], 1002);
        } else {
            assert_eq!(got, 251);
        }
    })
    .await;
}

#[tokio::test]
async fn test_scatterv_explicit_displacements() {
    run_collective(3, |comm| async move {
        let rank = comm.rank();
        // Chunks out of rank order with a gap at index 4.
        let layout = Partition::new(vec![2, 1, 1], vec![2, 0, 5]).unwrap();
        let global = [10u8, 11, 12, 13, 14, 15];

        let mut local = [0u8; 4];
        let send = (rank == 0).then_some((&global[..], &layout));
        let got = comm.scatterv(0, send, &mut local).await.unwrap();

        let expected: &[u8] = match rank {
            0 => &[12, 13],
            1 => &[10],
            _ => &[15],
        };
        assert_eq!(&local[..got], expected);
    })
    .await;
}

#[tokio::test]
async fn test_scatterv_layout_exceeds_buffer() {
    run_collective(1, |comm| async move {
        let layout = Partition::new(vec![4], vec![2]).unwrap();
        let mut local = [0i32; 4];
        let err = comm
            .scatterv(0, Some((&[1, 2, 3, 4][..], &layout)), &mut local)
            .await
            .unwrap_err();
        assert!(matches!(err, MeshError::InvalidLayout { operation: "scatterv", .. }));
    })
    .await;
}
