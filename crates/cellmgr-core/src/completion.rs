//! Exactly-once completion for operations.
//!
//! [`CompletionSink::complete`] consumes the sink, so an operation can
//! deliver its result at most once. The paired [`OperationHandle`] resolves
//! when it does; if the sink is dropped without completing (the task
//! panicked or was aborted) the handle resolves to [`ModemError::Aborted`]
//! instead of hanging.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use cellmgr_common::error::ModemError;

/// Sending half: owned by the running operation.
#[derive(Debug)]
pub struct CompletionSink<T> {
    tx: oneshot::Sender<Result<T, ModemError>>,
}

impl<T> CompletionSink<T> {
    pub fn complete(self, result: Result<T, ModemError>) {
        if self.tx.send(result).is_err() {
            tracing::debug!("operation result discarded: caller is gone");
        }
    }
}

/// Receiving half: a future resolving to the operation's result.
#[derive(Debug)]
pub struct OperationHandle<T> {
    rx: oneshot::Receiver<Result<T, ModemError>>,
}

impl<T> Future for OperationHandle<T> {
    type Output = Result<T, ModemError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(ModemError::Aborted(
                "operation ended without delivering a result".into(),
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Create a connected sink/handle pair.
pub fn completion<T>() -> (CompletionSink<T>, OperationHandle<T>) {
    let (tx, rx) = oneshot::channel();
    (CompletionSink { tx }, OperationHandle { rx })
}

/// Spawn `operation` on the tokio runtime and return its handle.
pub fn spawn_operation<T, F>(operation: F) -> OperationHandle<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T, ModemError>> + Send + 'static,
{
    let (sink, handle) = completion();
    tokio::spawn(async move {
        sink.complete(operation.await);
    });
    handle
}
