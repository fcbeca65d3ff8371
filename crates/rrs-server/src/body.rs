//! Stream adapters for object bodies.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Bytes;
use futures::Stream;
use tokio::time::{Instant, Sleep};
use tracing::error;

use crate::metrics::{MetricLabels, MetricsSink};

/// Fails a byte stream that produces nothing for longer than `idle`.
///
/// The deadline restarts on every item, so a slow but steady transfer is
/// never cut off. After a timeout the stream ends.
pub struct IdleTimeout<S> {
    inner: S,
    idle: Option<Duration>,
    deadline: Option<Pin<Box<Sleep>>>,
    expired: bool,
}

impl<S> IdleTimeout<S> {
    /// Wrap `inner`. `None` disables the timeout.
    pub fn new(inner: S, idle: Option<Duration>) -> Self {
        Self {
            inner,
            idle,
            deadline: idle.map(|d| Box::pin(tokio::time::sleep(d))),
            expired: false,
        }
    }
}

impl<S> Stream for IdleTimeout<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.expired {
            return Poll::Ready(None);
        }
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(item) => {
                if let (Some(deadline), Some(idle)) = (this.deadline.as_mut(), this.idle) {
                    deadline.as_mut().reset(Instant::now() + idle);
                }
                Poll::Ready(item)
            }
            Poll::Pending => {
                let timed_out = match this.deadline.as_mut() {
                    Some(deadline) => deadline.as_mut().poll(cx).is_ready(),
                    None => false,
                };
                if timed_out {
                    this.expired = true;
                    Poll::Ready(Some(Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "body idle timeout",
                    ))))
                } else {
                    Poll::Pending
                }
            }
        }
    }
}

/// Object body stream that reports a completed read to the metrics sink
/// once the object has been fully sent.
pub struct MeteredStream<S> {
    inner: S,
    bytes: u64,
    on_complete: Option<(Arc<dyn MetricsSink>, MetricLabels)>,
}

impl<S> MeteredStream<S> {
    pub fn new(inner: S, metrics: Arc<dyn MetricsSink>, labels: MetricLabels) -> Self {
        Self {
            inner,
            bytes: 0,
            on_complete: Some((metrics, labels)),
        }
    }
}

impl<S> Stream for MeteredStream<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.bytes += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                // Headers are already sent; failing the body aborts the response.
                error!(error = %e, "object read failed mid-stream");
                this.on_complete = None;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                if let Some((metrics, labels)) = this.on_complete.take() {
                    metrics.record_read(&labels, this.bytes);
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
