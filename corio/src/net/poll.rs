use crate::reactor::ReactorHandle;
use crate::reactor::command::Command;
use crate::reactor::io::PollSlot;
use crate::scheduler::context;
use crate::time::{Sleep, sleep};

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::os::fd::{AsRawFd, RawFd};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

/// Readiness direction a poll waits for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PollOp {
    Read,
    Write,
}

/// Outcome of a readiness wait.
///
/// `Event` is the only outcome after which I/O can make progress; callers
/// must check it before trusting any accompanying byte count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PollStatus {
    /// The descriptor is ready in the requested direction.
    Event,
    /// The deadline elapsed first.
    Timeout,
    /// The descriptor reported an error, or it could not be registered.
    Error,
    /// The peer hung up.
    Closed,
}

impl fmt::Display for PollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PollStatus::Event => "event",
            PollStatus::Timeout => "timeout",
            PollStatus::Error => "error",
            PollStatus::Closed => "closed",
        })
    }
}

/// Waits until `source` is ready for `op`, or `timeout` elapses.
///
/// A zero `timeout` waits indefinitely. Interest is registered with the
/// reactor on first poll and removed exactly once, when the future
/// completes or is dropped.
///
/// # Panics
///
/// The returned future panics if polled outside of a scheduler.
///
/// # Examples
///
/// ```rust,ignore
/// match corio::net::poll(&socket, PollOp::Read, Duration::from_secs(1)).await {
///     PollStatus::Event => { /* read */ }
///     other => return other,
/// }
/// ```
pub fn poll<S>(source: &S, op: PollOp, timeout: Duration) -> PollFuture<'_>
where
    S: AsRawFd + ?Sized,
{
    PollFuture {
        fd: source.as_raw_fd(),
        op,
        timeout,
        slot: PollSlot::new(),
        registered: None,
        deadline: None,
        _source: PhantomData,
    }
}

/// Future returned by [`poll`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct PollFuture<'a> {
    fd: RawFd,
    op: PollOp,
    timeout: Duration,
    slot: Arc<PollSlot>,

    /// Reactor holding the registration, until it is withdrawn.
    registered: Option<ReactorHandle>,
    deadline: Option<Pin<Box<Sleep>>>,

    /// Ties the future to the borrowed descriptor owner.
    _source: PhantomData<&'a ()>,
}

impl PollFuture<'_> {
    fn register(&mut self) -> Result<(), ()> {
        let reactor = context::reactor();

        let command = Command::Register {
            fd: self.fd,
            op: self.op,
            slot: self.slot.clone(),
        };

        if reactor.send(command).is_err() {
            tracing::warn!(fd = self.fd, op = ?self.op, "reactor stopped, poll failed");
            return Err(());
        }

        self.registered = Some(reactor);

        if !self.timeout.is_zero() {
            self.deadline = Some(Box::pin(sleep(self.timeout)));
        }

        Ok(())
    }

    fn deregister(&mut self) {
        if let Some(reactor) = self.registered.take() {
            let _ = reactor.send(Command::Deregister {
                fd: self.fd,
                slot: self.slot.clone(),
            });
        }
        self.deadline = None;
    }
}

impl Future for PollFuture<'_> {
    type Output = PollStatus;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<PollStatus> {
        let this = self.get_mut();

        if this.registered.is_none() && this.register().is_err() {
            return Poll::Ready(PollStatus::Error);
        }

        if let Some(status) = this.slot.take_or_park(cx.waker()) {
            this.deregister();
            return Poll::Ready(status);
        }

        if let Some(deadline) = this.deadline.as_mut() {
            if deadline.as_mut().poll(cx).is_ready() {
                this.slot.complete(PollStatus::Timeout);

                // The reactor may have completed the slot first.
                let status = this
                    .slot
                    .take_or_park(cx.waker())
                    .unwrap_or(PollStatus::Timeout);
                this.deregister();
                return Poll::Ready(status);
            }
        }

        Poll::Pending
    }
}

impl Drop for PollFuture<'_> {
    fn drop(&mut self) {
        self.deregister();
    }
}

impl fmt::Debug for PollFuture<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollFuture")
            .field("fd", &self.fd)
            .field("op", &self.op)
            .field("timeout", &self.timeout)
            .finish()
    }
}
