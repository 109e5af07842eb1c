use rankmesh::{MeshError, ReduceOp};

use super::helpers::{rendezvous_only, run_collective, run_collective_with};

async fn check_reduce_sum(world: u32, root: u32) {
    run_collective(world, move |comm| async move {
        let rank = comm.rank();
        let data = vec![(rank + 1) as i64, 10 * (rank as i64 + 1)];
        let result = comm.reduce(root, &data, ReduceOp::Sum).await.unwrap();

        let n = world as i64;
        if rank == root {
            assert_eq!(result, Some(vec![n * (n + 1) / 2, 10 * n * (n + 1) / 2]));
        } else {
            assert_eq!(result, None);
        }
    })
    .await;
}

#[tokio::test]
async fn test_reduce_2_nodes() {
    check_reduce_sum(2, 0).await;
}

#[tokio::test]
async fn test_reduce_4_nodes_nonzero_root() {
    check_reduce_sum(4, 3).await;
}

#[tokio::test]
async fn test_reduce_non_power_of_two() {
    check_reduce_sum(5, 0).await;
    check_reduce_sum(7, 4).await;
}

#[tokio::test]
async fn test_reduce_single_rank() {
    check_reduce_sum(1, 0).await;
}

#[tokio::test]
async fn test_reduce_sum_and_max() {
    run_collective(4, |comm| async move {
        let values = [17i32, 83, 5, 42];
        let local = [values[comm.rank() as usize]];

        let sum = comm.reduce(0, &local, ReduceOp::Sum).await.unwrap();
        let max = comm.reduce(0, &local, ReduceOp::Max).await.unwrap();
        let min = comm.reduce(0, &local, ReduceOp::Min).await.unwrap();

        if comm.rank() == 0 {
            assert_eq!(sum, Some(vec![147]));
            assert_eq!(max, Some(vec![83]));
            assert_eq!(min, Some(vec![5]));
        }
    })
    .await;
}

#[tokio::test]
async fn test_reduce_prod_f64_rendezvous() {
    run_collective_with(3, rendezvous_only(), |comm| async move {
        let local = vec![comm.rank() as f64 + 2.0; 1024];
        let prod = comm.reduce(1, &local, ReduceOp::Prod).await.unwrap();
        if comm.rank() == 1 {
            assert_eq!(prod, Some(vec![24.0; 1024]));
        }
    })
    .await;
}

#[tokio::test]
async fn test_reduce_float_is_repeatable() {
    run_collective(6, |comm| async move {
        let local = [0.1f32 * (comm.rank() as f32 + 1.0), 1e-7, 3.3];
        let first = comm.reduce(0, &local, ReduceOp::Sum).await.unwrap();
        for _ in 0..5 {
            let again = comm.reduce(0, &local, ReduceOp::Sum).await.unwrap();
            let same = match (&first, &again) {
                (Some(a), Some(b)) => a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits()),
                (None, None) => true,
                _ => false,
            };
            assert!(same, "rank {} saw a different float sum", comm.rank());
        }
    })
    .await;
}

#[tokio::test]
async fn test_reduce_length_mismatch() {
    run_collective(2, |comm| async move {
        let local = if comm.rank() == 0 { vec![1u32; 3] } else { vec![1u32; 4] };
        let result = comm.reduce(0, &local, ReduceOp::Sum).await;
        if comm.rank() == 0 {
            assert!(matches!(result, Err(MeshError::Truncated { .. })));
        }
    })
    .await;
}
