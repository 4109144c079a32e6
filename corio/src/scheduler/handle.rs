use super::context;
use super::queue::RunQueue;
use super::task::{JoinHandle, Resumable, Task};
use crate::reactor::ReactorHandle;

use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll, Waker};

/// Increments a counter for as long as it is alive.
pub(crate) struct CountGuard(Arc<AtomicUsize>);

impl CountGuard {
    pub(crate) fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for CountGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// State shared by a scheduler and all of its handles.
pub(crate) struct Shared {
    pub(crate) queue: Arc<RunQueue>,
    pub(crate) reactor: ReactorHandle,

    /// Scheduled tasks not yet completed, accept loops excluded.
    outstanding: Arc<AtomicUsize>,

    /// Long-lived accept loops, stopped explicitly on shutdown.
    detached: Arc<AtomicUsize>,

    accepting: AtomicBool,
    shutdown_waiters: Mutex<Vec<Waker>>,
}

/// Cloneable reference to a scheduler.
///
/// A `Handle` can schedule work and inspect the outstanding count from any
/// thread, including from inside tasks. It does not keep worker threads
/// alive: once the owning [`Scheduler`](crate::Scheduler) shuts down, every
/// submission is rejected.
#[derive(Clone)]
pub struct Handle {
    pub(crate) shared: Arc<Shared>,
}

impl Handle {
    pub(crate) fn new(queue: Arc<RunQueue>, reactor: ReactorHandle) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue,
                reactor,
                outstanding: Arc::new(AtomicUsize::new(0)),
                detached: Arc::new(AtomicUsize::new(0)),
                accepting: AtomicBool::new(true),
                shutdown_waiters: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Returns the handle of the scheduler running the current task.
    ///
    /// # Panics
    ///
    /// Panics when called outside a scheduler's worker context.
    pub fn current() -> Handle {
        context::current()
    }

    /// Like [`current`](Self::current), without panicking.
    pub fn try_current() -> Option<Handle> {
        context::try_current()
    }

    /// Takes ownership of `task` and queues its first resumption.
    ///
    /// Returns `false` (dropping the task) when the scheduler is shutting
    /// down.
    pub fn schedule<R>(&self, task: R) -> bool
    where
        R: Resumable,
    {
        self.submit(task, &self.shared.outstanding).is_some()
    }

    /// Like [`schedule`](Self::schedule), returning a handle to the result.
    pub fn spawn<R>(&self, task: R) -> Option<JoinHandle<R::Output>>
    where
        R: Resumable,
    {
        self.submit(task, &self.shared.outstanding)
            .map(|task| JoinHandle { task })
    }

    /// Schedules a long-lived task that is not part of [`size`](Self::size).
    ///
    /// Such a task must finish once [`shutdown_requested`] resolves.
    ///
    /// [`shutdown_requested`]: Self::shutdown_requested
    pub(crate) fn spawn_detached<R>(&self, task: R) -> bool
    where
        R: Resumable<Output = ()>,
    {
        self.submit(task, &self.shared.detached).is_some()
    }

    fn submit<R>(&self, task: R, counter: &Arc<AtomicUsize>) -> Option<Arc<Task<R::Output>>>
    where
        R: Resumable,
    {
        // Counted before the check so that shutdown, which flips the flag
        // and then waits for zero, always sees an accepted task.
        let guard = CountGuard::new(counter);

        if !self.shared.accepting.load(Ordering::SeqCst) {
            tracing::debug!("scheduler is shutting down, task rejected");
            return None;
        }

        let task = Task::new(task, self.shared.queue.clone(), guard);
        self.shared.queue.push(task.clone());

        Some(task)
    }

    /// Number of scheduled tasks that have not completed yet.
    ///
    /// Accept loops of a [`TcpServer`](crate::net::TcpServer) are not
    /// counted.
    pub fn size(&self) -> usize {
        self.shared.outstanding.load(Ordering::SeqCst)
    }

    /// Returns `true` when no scheduled task is outstanding.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Returns `true` once shutdown has begun.
    pub fn is_shutting_down(&self) -> bool {
        !self.shared.accepting.load(Ordering::SeqCst)
    }

    pub(crate) fn is_drained(&self) -> bool {
        self.shared.outstanding.load(Ordering::SeqCst) == 0
            && self.shared.detached.load(Ordering::SeqCst) == 0
    }

    /// Rejects further submissions and wakes everything waiting on
    /// [`shutdown_requested`](Self::shutdown_requested).
    pub(crate) fn begin_shutdown(&self) {
        self.shared.accepting.store(false, Ordering::SeqCst);

        let waiters = std::mem::take(&mut *self.shared.shutdown_waiters.lock());
        for waker in waiters {
            waker.wake();
        }
    }

    /// Resolves once shutdown has begun.
    pub(crate) fn shutdown_requested(&self) -> ShutdownRequested {
        ShutdownRequested {
            handle: self.clone(),
        }
    }

    pub(crate) fn reactor(&self) -> &ReactorHandle {
        &self.shared.reactor
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("size", &self.size())
            .field("shutting_down", &self.is_shutting_down())
            .finish()
    }
}

/// Future returned by [`Handle::shutdown_requested`].
pub(crate) struct ShutdownRequested {
    handle: Handle,
}

impl Future for ShutdownRequested {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.handle.is_shutting_down() {
            return Poll::Ready(());
        }

        let mut waiters = self.handle.shared.shutdown_waiters.lock();

        if self.handle.is_shutting_down() {
            return Poll::Ready(());
        }

        if !waiters.iter().any(|w| w.will_wake(cx.waker())) {
            waiters.push(cx.waker().clone());
        }

        Poll::Pending
    }
}
