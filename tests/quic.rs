use rankmesh::{Communicator, MeshConfig, Partition, ReduceOp, spawn_ranks};

#[tokio::test]
async fn test_quic_rendezvous_exchange() {
    let comms = Communicator::local_quic(2, MeshConfig::default()).await.unwrap();
    let out = spawn_ranks(comms, |comm| async move {
        let peer = 1 - comm.rank();
        let data = vec![comm.rank() as i32 + 1; 10_000];
        let mut buf = vec![0i32; 10_000];
        comm.send_receive(&data, peer, 0, &mut buf, peer, 0).await?;
        comm.finalize().await?;
        Ok(buf[9_999])
    })
    .await
    .unwrap();
    assert_eq!(out, vec![2, 1]);
}

#[tokio::test]
async fn test_quic_collectives() {
    let comms = Communicator::local_quic(4, MeshConfig::default()).await.unwrap();
    let out = spawn_ranks(comms, |comm| async move {
        let rank = comm.rank();
        let layout = Partition::even(1003, comm.size());
        let global: Vec<i32> = if rank == 0 { (0..1003).collect() } else { Vec::new() };

        let mut local = vec![0i32; layout.count(rank)];
        comm.scatterv(0, (rank == 0).then_some((global.as_slice(), &layout)), &mut local)
            .await?;
        let local_sum: i64 = local.iter().map(|&x| x as i64).sum();

        let total = comm.all_reduce(&[local_sum], ReduceOp::Sum).await?;
        comm.barrier().await?;
        comm.finalize().await?;
        Ok(total[0])
    })
    .await
    .unwrap();
    assert!(out.iter().all(|&t| t == 1002 * 1003 / 2));
}

#[tokio::test]
async fn test_quic_self_send() {
    let comms = Communicator::local_quic(1, MeshConfig::default()).await.unwrap();
    let comm = comms.into_iter().next().unwrap();
    comm.send(0, 5, &[1u64, 2, 3]).await.unwrap();
    let mut buf = [0u64; 3];
    let status = comm.receive(0, 5, &mut buf).await.unwrap();
    assert_eq!(status.count, 3);
    assert_eq!(buf, [1, 2, 3]);
    comm.finalize().await.unwrap();
}
