//! Channel between a running pipeline and its consumer.

use super::event::ProgressEvent;
use crate::error::ApiError;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

/// Bounded channel pair. The pipeline holds the sink.
pub fn channel(capacity: usize) -> (EventSink, mpsc::Receiver<ProgressEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSink { tx }, rx)
}

/// Producer side of the progress stream.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<ProgressEvent>,
}

impl EventSink {
    /// Send one event. Fails with [`ApiError::Cancelled`] once the consumer is gone.
    pub async fn emit(&self, event: ProgressEvent) -> Result<(), ApiError> {
        self.tx.send(event).await.map_err(|_| ApiError::Cancelled)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Run `work` unless the consumer goes away first, in which case `work`
    /// is dropped mid-flight.
    pub async fn guard<F: Future>(&self, work: F) -> Result<F::Output, ApiError> {
        tokio::select! {
            biased;
            _ = self.tx.closed() => Err(ApiError::Cancelled),
            output = work => Ok(output),
        }
    }
}

/// Consumer side: the events of one pipeline run, in order.
///
/// Dropping the stream aborts the run.
pub struct ProgressStream {
    events: ReceiverStream<ProgressEvent>,
    task: JoinHandle<()>,
}

impl ProgressStream {
    pub fn new(rx: mpsc::Receiver<ProgressEvent>, task: JoinHandle<()>) -> Self {
        Self {
            events: ReceiverStream::new(rx),
            task,
        }
    }
}

impl Stream for ProgressStream {
    type Item = ProgressEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

impl Drop for ProgressStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}
