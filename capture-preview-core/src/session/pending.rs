use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::thread;

use tokio::sync::oneshot;

/// Completion of a command queued on the pipeline worker.
///
/// Await it from async code or call [`Pending::wait`] from a plain thread.
/// If the worker goes away before replying (or was never available), the
/// command resolves to its fallback value instead.
#[must_use = "the command runs regardless, but its result is lost"]
pub struct Pending<T> {
    rx: Option<oneshot::Receiver<T>>,
    fallback: fn() -> T,
}

impl<T> Pending<T> {
    pub(crate) fn new(rx: oneshot::Receiver<T>, fallback: fn() -> T) -> Self {
        Self {
            rx: Some(rx),
            fallback,
        }
    }

    /// A command that was never queued.
    pub(crate) fn disconnected(fallback: fn() -> T) -> Self {
        Self { rx: None, fallback }
    }

    /// Block the current thread until the command completes.
    ///
    /// Safe to call from a thread that drives an async runtime: the wait then
    /// happens on a short-lived helper thread, and this thread stays blocked
    /// until it returns.
    pub fn wait(mut self) -> T
    where
        T: Send,
    {
        let Some(rx) = self.rx.take() else {
            return (self.fallback)();
        };
        // `blocking_recv` refuses to run inside a runtime context.
        let received = if tokio::runtime::Handle::try_current().is_ok() {
            thread::scope(|scope| scope.spawn(move || rx.blocking_recv().ok()).join().ok().flatten())
        } else {
            rx.blocking_recv().ok()
        };
        received.unwrap_or_else(self.fallback)
    }
}

impl<T> Future for Pending<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let fallback = self.fallback;
        let Some(rx) = self.rx.as_mut() else {
            return Poll::Ready(fallback());
        };
        match Pin::new(rx).poll(cx) {
            Poll::Ready(result) => {
                self.rx = None;
                Poll::Ready(result.unwrap_or_else(|_| fallback()))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Unpin for Pending<T> {}
