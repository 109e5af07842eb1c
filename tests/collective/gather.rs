use rankmesh::{MeshError, Partition};

use super::helpers::{rendezvous_only, run_collective, run_collective_with};

#[tokio::test]
async fn test_gather_4_nodes() {
    run_collective(4, |comm| async move {
        let rank = comm.rank();
        let local = vec![rank as i32; 3];
        let mut global = vec![-1i32; 12];
        let recv = (rank == 0).then_some(global.as_mut_slice());
        comm.gather(0, &local, recv).await.unwrap();
        if rank == 0 {
            assert_eq!(global, vec![0, 0, 0, 1, 1, 1, 2, 2, 2, 3, 3, 3]);
        }
    })
    .await;
}

#[tokio::test]
async fn test_scatter_double_gather_round_trip() {
    run_collective_with(4, rendezvous_only(), |comm| async move {
        let rank = comm.rank();
        let is_root = rank == 1;
        let mut global: Vec<i32> = if is_root { (0..1000).collect() } else { Vec::new() };

        let mut local = vec![0i32; 250];
        comm.scatter(1, is_root.then_some(global.as_slice()), &mut local)
            .await
            .unwrap();
        for x in &mut local {
            *x *= 2;
        }
        comm.gather(1, &local, is_root.then_some(global.as_mut_slice()))
            .await
            .unwrap();

        if is_root {
            assert_eq!(global[0], 0);
            assert_eq!(global[250], 500);
            assert_eq!(global[999], 1998);
        }
    })
    .await;
}

#[tokio::test]
async fn test_gatherv_irregular() {
    run_collective(4, |comm| async move {
        let rank = comm.rank();
        let layout = Partition::even(1003, comm.size());
        let local: Vec<i32> = layout.range(rank).map(|i| i as i32 * 2).collect();

        let mut global = vec![0i32; 1003];
        let recv = (rank == 0).then_some((global.as_mut_slice(), &layout));
        comm.gatherv(0, &local, recv).await.unwrap();

        if rank == 0 {
            assert_eq!(global[0], 0);
            assert_eq!(global[1002], 2004);
            assert!(global.iter().enumerate().all(|(i, &v)| v == i as i32 * 2));
        }
    })
    .await;
}

#[tokio::test]
async fn test_gatherv_leaves_gaps_untouched() {
    run_collective(2, |comm| async move {
        let rank = comm.rank();
        let layout = Partition::new(vec![1, 2], vec![3, 0]).unwrap();
        let local: Vec<u32> = if rank == 0 { vec![100] } else { vec![7, 8] };

        let mut global = [55u32; 5];
        let recv = (rank == 0).then_some((&mut global[..], &layout));
        comm.gatherv(0, &local, recv).await.unwrap();

        if rank == 0 {
            assert_eq!(global, [7, 8, 55, 100, 55]);
        }
    })
    .await;
}

#[tokio::test]
async fn test_gather_root_buffer_wrong_length() {
    run_collective(1, |comm| async move {
        let mut global = [0i32; 5];
        let err = comm
            .gather(0, &[1, 2], Some(&mut global[..]))
            .await
            .unwrap_err();
        assert!(matches!(err, MeshError::InvalidLayout { operation: "gather", .. }));
    })
    .await;
}

#[tokio::test]
async fn test_gatherv_root_count_mismatch() {
    run_collective(1, |comm| async move {
        let layout = Partition::from_counts(vec![3]);
        let mut global = [0i32; 3];
        let err = comm
            .gatherv(0, &[1, 2], Some((&mut global[..], &layout)))
            .await
            .unwrap_err();
        assert!(matches!(err, MeshError::InvalidLayout { operation: "gatherv", .. }));
    })
    .await;
}
