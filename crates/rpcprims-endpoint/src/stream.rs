use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::stream::FusedStream;
use futures_core::Stream;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{EndpointError, Result};
use crate::handler::{BoxStream, HandlerResult};

/// Results of one stream call, as seen by a local caller.
///
/// Elements pass through one at a time in handler order, without buffering.
/// The token is checked before the handler is polled and again before a ready
/// element is handed out; once it is cancelled the stream ends cleanly and the
/// pending element is dropped. A handler error is yielded once and ends the
/// stream. After ending, the handler stream is dropped and the stream stays
/// terminated.
pub struct LocalStream {
    inner: Option<BoxStream<HandlerResult>>,
    cancel: CancellationToken,
    method: String,
}

impl LocalStream {
    pub(crate) fn new(
        inner: BoxStream<HandlerResult>,
        cancel: CancellationToken,
        method: String,
    ) -> Self {
        Self {
            inner: Some(inner),
            cancel,
            method,
        }
    }

    /// Token this stream observes. Cancelling it ends the stream.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Request early termination. Equivalent to cancelling the token.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    fn stop_cancelled(&mut self) {
        if self.inner.take().is_some() {
            tracing::debug!(method = %self.method, "stream stopped on cancellation");
        }
    }
}

impl Stream for LocalStream {
    type Item = Result<Value>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.cancel.is_cancelled() {
            this.stop_cancelled();
            return Poll::Ready(None);
        }

        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        match inner.as_mut().poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => {
                this.inner = None;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Ok(_))) if this.cancel.is_cancelled() => {
                this.stop_cancelled();
                Poll::Ready(None)
            }
            Poll::Ready(Some(Ok(value))) => Poll::Ready(Some(Ok(value))),
            Poll::Ready(Some(Err(err))) => {
                this.inner = None;
                Poll::Ready(Some(Err(EndpointError::Handler(err))))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            Some(inner) => (0, inner.size_hint().1),
            None => (0, Some(0)),
        }
    }
}

impl FusedStream for LocalStream {
    fn is_terminated(&self) -> bool {
        self.inner.is_none()
    }
}

impl fmt::Debug for LocalStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStream")
            .field("method", &self.method)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("terminated", &self.inner.is_none())
            .finish()
    }
}
