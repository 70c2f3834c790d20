//! Per-connection write and idle timeouts.
//!
//! [`TimedStream`] wraps an accepted socket. A read or write that makes
//! progress pushes the idle deadline forward; a connection with no traffic for
//! the idle period fails its pending read or write with `TimedOut`. A single
//! write that stays blocked longer than the write timeout fails the same way.
//!
//! The idle deadline only runs between requests. [`TrackInFlight`] wraps the
//! connection's service and marks the shared [`InFlight`] counter busy while a
//! handler runs, so a slow handler is never cut off for being quiet.
//!
//! The read timeout is not handled here: hyper enforces it while reading the
//! request head.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::{sleep, Instant, Sleep};
use tower::Service;

/// Number of requests currently being handled on one connection.
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    /// Mark a request as started. It counts until the guard is dropped.
    pub fn enter(&self) -> InFlightGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(Arc::clone(&self.0))
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::SeqCst) > 0
    }
}

/// Decrements the [`InFlight`] count on drop.
#[derive(Debug)]
pub struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Service wrapper that holds an [`InFlightGuard`] for the life of each call.
#[derive(Debug, Clone)]
pub struct TrackInFlight<S> {
    inner: S,
    in_flight: InFlight,
}

impl<S> TrackInFlight<S> {
    pub fn new(inner: S, in_flight: InFlight) -> Self {
        Self { inner, in_flight }
    }
}

impl<S, R> Service<R> for TrackInFlight<S>
where
    S: Service<R>,
    S::Future: Send + 'static,
    S::Response: 'static,
    S::Error: 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: R) -> Self::Future {
        let guard = self.in_flight.enter();
        let response = self.inner.call(req);
        Box::pin(async move {
            let result = response.await;
            drop(guard);
            result
        })
    }
}

/// A socket with idle and stalled-write deadlines.
pub struct TimedStream<S> {
    inner: S,
    idle: Duration,
    write: Duration,
    in_flight: InFlight,
    was_busy: bool,
    idle_deadline: Pin<Box<Sleep>>,
    write_deadline: Option<Pin<Box<Sleep>>>,
}

impl<S> TimedStream<S> {
    /// Must be called from within a tokio runtime.
    pub fn new(inner: S, idle: Duration, write: Duration, in_flight: InFlight) -> Self {
        Self {
            inner,
            idle,
            write,
            in_flight,
            was_busy: false,
            idle_deadline: Box::pin(sleep(idle)),
            write_deadline: None,
        }
    }

    fn touch(&mut self) {
        let next = Instant::now() + self.idle;
        self.idle_deadline.as_mut().reset(next);
    }

    fn poll_idle(&mut self, cx: &mut Context<'_>) -> Poll<io::Error> {
        // A running handler counts as activity; the idle period restarts
        // once it finishes.
        if self.in_flight.is_busy() {
            self.was_busy = true;
            return Poll::Pending;
        }
        if self.was_busy {
            self.was_busy = false;
            self.touch();
        }

        match self.idle_deadline.as_mut().poll(cx) {
            Poll::Ready(()) => Poll::Ready(io::Error::new(
                io::ErrorKind::TimedOut,
                "connection idle timeout",
            )),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for TimedStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();

        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                if buf.filled().len() > before {
                    this.touch();
                }
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Pending => this.poll_idle(cx).map(Err),
        }
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for TimedStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();

        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(result) => {
                this.write_deadline = None;
                if matches!(result, Ok(n) if n > 0) {
                    this.touch();
                }
                Poll::Ready(result)
            }
            Poll::Pending => {
                let limit = this.write;
                let deadline = this
                    .write_deadline
                    .get_or_insert_with(|| Box::pin(sleep(limit)));
                if deadline.as_mut().poll(cx).is_ready() {
                    this.write_deadline = None;
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "connection write timeout",
                    )));
                }
                this.poll_idle(cx).map(Err)
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}
