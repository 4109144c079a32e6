use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A computation the scheduler knows how to resume.
///
/// The scheduler owns a `Resumable` from the moment it is scheduled. It is
/// first resumed by a worker context (never eagerly by the caller), and
/// every later resumption follows a wake-up of the waker passed in `cx`.
/// Once it returns [`Poll::Ready`] control goes back to the scheduler,
/// which stores the output and drops the computation.
///
/// Every `Future + Send + 'static` with a `Send + 'static` output is a
/// `Resumable`. Types that do not meet these bounds are rejected when they
/// are handed to [`Scheduler::schedule`](crate::Scheduler::schedule) or
/// [`spawn`](super::spawn).
///
/// A computation produces exactly one of:
/// - nothing (`Output = ()`),
/// - a single value (`Output = T`, observed through a
///   [`JoinHandle`](super::JoinHandle)),
/// - a sequence of values, when its body is a [`Generator`](super::Generator).
pub trait Resumable: Send + 'static {
    /// Value produced on completion.
    type Output: Send + 'static;

    /// Runs the computation until its next suspension point.
    fn resume(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output>;
}

impl<F> Resumable for F
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    type Output = F::Output;

    fn resume(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.poll(cx)
    }
}
