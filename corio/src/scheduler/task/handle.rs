use super::Task;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// A handle to a scheduled task.
///
/// Awaiting a `JoinHandle` yields the task's value once it completes.
///
/// Dropping the `JoinHandle` does **not** cancel the task; it only
/// discards the ability to observe its result.
///
/// # Panics
///
/// Awaiting the handle panics if the task itself panicked, or if the
/// handle is polled again after it already returned the value.
pub struct JoinHandle<T> {
    pub(crate) task: Arc<Task<T>>,
}

impl<T: Send + 'static> JoinHandle<T> {
    /// Returns `true` once the task has completed, with or without a value.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl<T: Send + 'static> Future for JoinHandle<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        match self.task.poll_result(cx.waker()) {
            None => Poll::Pending,
            Some(Some(value)) => Poll::Ready(value),
            Some(None) if self.task.panicked() => panic!("joined task panicked"),
            Some(None) => panic!("JoinHandle polled after completion"),
        }
    }
}

impl<T> fmt::Debug for JoinHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinHandle").finish_non_exhaustive()
    }
}
