use rankmesh::ReduceOp;

use super::helpers::{rendezvous_only, run_collective, run_collective_with};

#[tokio::test]
async fn test_allreduce_2_nodes_f32() {
    run_collective(2, |comm| async move {
        let rank = comm.rank();
        let data = vec![(rank + 1) as f32; 4];
        let out = comm.all_reduce(&data, ReduceOp::Sum).await.unwrap();
        // Sum of [1,1,1,1] + [2,2,2,2] = [3,3,3,3]
        assert_eq!(out, vec![3.0f32; 4], "rank {rank} allreduce failed");
    })
    .await;
}

#[tokio::test]
async fn test_allreduce_rank_plus_one() {
    run_collective(4, |comm| async move {
        let out = comm
            .all_reduce(&[comm.rank() as i32 + 1], ReduceOp::Sum)
            .await
            .unwrap();
        assert_eq!(out, vec![10]);
    })
    .await;
}

#[tokio::test]
async fn test_allreduce_uneven_ring_chunks() {
    run_collective(3, |comm| async move {
        let rank = comm.rank() as i64;
        // 10 elements over 3 ranks: chunks of 4, 3, 3.
        let data: Vec<i64> = (0..10).map(|i| i * (rank + 1)).collect();
        let out = comm.all_reduce(&data, ReduceOp::Sum).await.unwrap();
        let expected: Vec<i64> = (0..10).map(|i| i * 6).collect();
        assert_eq!(out, expected);
    })
    .await;
}

#[tokio::test]
async fn test_allreduce_fewer_elements_than_ranks() {
    run_collective(5, |comm| async move {
        let rank = comm.rank() as u64;
        let out = comm
            .all_reduce(&[rank, 100 - rank], ReduceOp::Max)
            .await
            .unwrap();
        assert_eq!(out, vec![4, 100]);
    })
    .await;
}

#[tokio::test]
async fn test_allreduce_empty() {
    run_collective(3, |comm| async move {
        let out = comm.all_reduce::<f64>(&[], ReduceOp::Sum).await.unwrap();
        assert!(out.is_empty());
    })
    .await;
}

#[tokio::test]
async fn test_allreduce_large_rendezvous_identical_everywhere() {
    run_collective_with(4, rendezvous_only(), |comm| async move {
        let rank = comm.rank() as f64;
        let data: Vec<f64> = (0..4096).map(|i| (i as f64).sin() * (rank + 0.3)).collect();
        let out = comm.all_reduce(&data, ReduceOp::Sum).await.unwrap();

        // Every rank must hold bit-identical results.
        let mut root_copy = out.clone();
        comm.broadcast(0, &mut root_copy).await.unwrap();
        assert!(out.iter().zip(&root_copy).all(|(a, b)| a.to_bits() == b.to_bits()));
    })
    .await;
}

#[tokio::test]
async fn test_collectives_interleave_in_call_order() {
    run_collective(4, |comm| async move {
        let rank = comm.rank();
        let sum = comm.all_reduce(&[1u32; 8], ReduceOp::Sum).await.unwrap();
        comm.barrier().await.unwrap();
        let mut b = [rank; 2];
        comm.broadcast(3, &mut b).await.unwrap();
        let total = comm.all_reduce(&[rank], ReduceOp::Sum).await.unwrap();
        assert_eq!(sum, vec![4; 8]);
        assert_eq!(b, [3, 3]);
        assert_eq!(total, vec![6]);
    })
    .await;
}
