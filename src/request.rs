//! Non-blocking request handles.

use futures::future::join_all;
use tokio::sync::oneshot;

use crate::element::{Element, decode_into};
use crate::engine::{Delivery, Posted};
use crate::error::{MeshError, Result};
use crate::types::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Send,
    Receive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Active,
    Completed,
}

enum Inner<T> {
    Active {
        completion: oneshot::Receiver<Result<Delivery>>,
        buffer: Vec<T>,
    },
    Completed {
        buffer: Vec<T>,
    },
}

/// Handle to an in-flight `isend` or `irecv`.
///
/// The request owns the buffer until completion has been observed through
/// [`test`](Self::test) or [`wait`](Self::wait); [`into_buffer`](Self::into_buffer)
/// then hands it back. Completion is reported exactly once: later calls to
/// `test` or `wait` fail with [`MeshError::RequestAlreadyCompleted`].
///
/// Dropping an active request does not cancel the transfer. The engine
/// still completes it and discards the outcome.
pub struct Request<T: Element> {
    id: u64,
    kind: RequestKind,
    inner: Inner<T>,
}

impl<T: Element> Request<T> {
    pub(crate) fn new(posted: Posted, kind: RequestKind, buffer: Vec<T>) -> Self {
        Self {
            id: posted.id,
            kind,
            inner: Inner::Active {
                completion: posted.completion,
                buffer,
            },
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn state(&self) -> RequestState {
        match self.inner {
            Inner::Active { .. } => RequestState::Active,
            Inner::Completed { .. } => RequestState::Completed,
        }
    }

    /// Poll for completion without suspending.
    ///
    /// Returns `Ok(None)` while the operation is in flight.
    pub fn test(&mut self) -> Result<Option<Status>> {
        let outcome = match &mut self.inner {
            Inner::Active { completion, .. } => match completion.try_recv() {
                Ok(outcome) => Some(outcome),
                Err(oneshot::error::TryRecvError::Empty) => return Ok(None),
                Err(oneshot::error::TryRecvError::Closed) => None,
            },
            Inner::Completed { .. } => {
                return Err(MeshError::RequestAlreadyCompleted { id: self.id });
            }
        };
        self.finish(outcome).map(Some)
    }

    /// Suspend until the operation completes.
    pub async fn wait(&mut self) -> Result<Status> {
        let outcome = match &mut self.inner {
            Inner::Active { completion, .. } => completion.await.ok(),
            Inner::Completed { .. } => {
                return Err(MeshError::RequestAlreadyCompleted { id: self.id });
            }
        };
        self.finish(outcome)
    }

    /// Take the buffer back after completion was observed.
    ///
    /// For a receive, the buffer is cut to the delivered element count.
    pub fn into_buffer(self) -> Result<Vec<T>> {
        match self.inner {
            Inner::Completed { buffer } => Ok(buffer),
            Inner::Active { .. } => Err(MeshError::RequestStillActive { id: self.id }),
        }
    }

    /// Record the terminal outcome. `None` means the engine went away.
    fn finish(&mut self, outcome: Option<Result<Delivery>>) -> Result<Status> {
        let mut buffer = match std::mem::replace(
            &mut self.inner,
            Inner::Completed { buffer: Vec::new() },
        ) {
            Inner::Active { buffer, .. } => buffer,
            Inner::Completed { buffer } => {
                self.inner = Inner::Completed { buffer };
                return Err(MeshError::RequestAlreadyCompleted { id: self.id });
            }
        };

        let result = match outcome {
            None => Err(MeshError::EngineShutdown),
            Some(Err(e)) => Err(e),
            Some(Ok(delivery)) => match self.kind {
                RequestKind::Send => Ok(Status {
                    source: delivery.src,
                    tag: delivery.tag,
                    count: buffer.len(),
                }),
                RequestKind::Receive => {
                    decode_into(&delivery.payload, &mut buffer).map(|count| {
                        buffer.truncate(count);
                        Status {
                            source: delivery.src,
                            tag: delivery.tag,
                            count,
                        }
                    })
                }
            },
        };

        match &result {
            Ok(status) => tracing::debug!(
                id = self.id,
                kind = ?self.kind,
                source = status.source,
                tag = status.tag,
                count = status.count,
                "request completed"
            ),
            Err(e) => tracing::debug!(id = self.id, kind = ?self.kind, error = %e, "request failed"),
        }

        self.inner = Inner::Completed { buffer };
        result
    }
}

impl<T: Element> std::fmt::Debug for Request<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state())
            .finish()
    }
}

/// Wait for every request, then return their statuses in input order.
///
/// All requests are driven to completion even if one fails; the first
/// failure in input order is returned.
pub async fn wait_all<T: Element>(requests: &mut [Request<T>]) -> Result<Vec<Status>> {
    join_all(requests.iter_mut().map(|r| r.wait()))
        .await
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::encode;

    fn pending<T: Element>(kind: RequestKind, buffer: Vec<T>) -> (Request<T>, oneshot::Sender<Result<Delivery>>) {
        let (tx, rx) = oneshot::channel();
        let req = Request::new(
            Posted {
                id: 7,
                completion: rx,
            },
            kind,
            buffer,
        );
        (req, tx)
    }

    #[tokio::test]
    async fn test_receive_completes_once() {
        let (mut req, tx) = pending::<i32>(RequestKind::Receive, vec![0; 4]);
        assert_eq!(req.test().unwrap(), None);
        assert_eq!(req.state(), RequestState::Active);

        tx.send(Ok(Delivery {
            src: 1,
            tag: 0,
            payload: encode(&[999i32]),
        }))
        .unwrap();

        let status = req.test().unwrap().unwrap();
        assert_eq!(status.source, 1);
        assert_eq!(status.count, 1);
        assert_eq!(req.state(), RequestState::Completed);

        assert!(matches!(
            req.test(),
            Err(MeshError::RequestAlreadyCompleted { id: 7 })
        ));
        assert!(matches!(
            req.wait().await,
            Err(MeshError::RequestAlreadyCompleted { id: 7 })
        ));
        assert_eq!(req.into_buffer().unwrap(), vec![999]);
    }

    #[tokio::test]
    async fn test_into_buffer_while_active() {
        let (req, _tx) = pending::<u8>(RequestKind::Send, vec![1, 2]);
        assert!(matches!(
            req.into_buffer(),
            Err(MeshError::RequestStillActive { id: 7 })
        ));
    }

    #[tokio::test]
    async fn test_send_status_counts_buffer() {
        let (mut req, tx) = pending::<f64>(RequestKind::Send, vec![1.0; 3]);
        tx.send(Ok(Delivery {
            src: 0,
            tag: 5,
            payload: Vec::new(),
        }))
        .unwrap();
        let status = req.wait().await.unwrap();
        assert_eq!(status.count, 3);
        assert_eq!(status.tag, 5);
        assert_eq!(req.into_buffer().unwrap(), vec![1.0; 3]);
    }

    #[tokio::test]
    async fn test_engine_gone() {
        let (mut req, tx) = pending::<i32>(RequestKind::Receive, vec![0]);
        drop(tx);
        assert!(matches!(req.wait().await, Err(MeshError::EngineShutdown)));
        assert_eq!(req.state(), RequestState::Completed);
    }

    #[tokio::test]
    async fn test_error_outcome_counts_as_completion() {
        let (mut req, tx) = pending::<i32>(RequestKind::Receive, vec![0]);
        tx.send(Err(MeshError::Truncated {
            capacity: 4,
            actual: 8,
        }))
        .unwrap();
        assert!(matches!(req.wait().await, Err(MeshError::Truncated { .. })));
        assert!(req.test().is_err());
    }

    #[tokio::test]
    async fn test_wait_all_in_order() {
        let (a, ta) = pending::<i32>(RequestKind::Receive, vec![0]);
        let (b, tb) = pending::<i32>(RequestKind::Receive, vec![0]);
        let mut reqs = vec![a, b];

        tb.send(Ok(Delivery {
            src: 2,
            tag: 0,
            payload: encode(&[2i32]),
        }))
        .unwrap();
        ta.send(Ok(Delivery {
            src: 1,
            tag: 0,
            payload: encode(&[1i32]),
        }))
        .unwrap();

        let statuses = wait_all(&mut reqs).await.unwrap();
        assert_eq!(statuses[0].source, 1);
        assert_eq!(statuses[1].source, 2);
        assert!(reqs.iter().all(|r| r.state() == RequestState::Completed));
    }
}
