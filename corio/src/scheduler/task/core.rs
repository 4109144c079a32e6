use super::JoinHandle;
use super::contract::Resumable;
use super::state::State;
use crate::scheduler::handle::{CountGuard, Handle};
use crate::scheduler::queue::RunQueue;

use parking_lot::Mutex;
use std::any::Any;
use std::cell::UnsafeCell;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::task::{Context, Poll, Waker};

/// A runnable unit of work that can be executed by the scheduler.
///
/// Erases the output type so run queues can hold any task as
/// `Arc<dyn Runnable>`.
pub(crate) trait Runnable: Send + Sync {
    fn run(self: Arc<Self>);
}

/// A scheduled computation together with its result slot.
pub(crate) struct Task<T> {
    /// The computation. Only touched by the context that moved the state
    /// to `Running`; emptied on completion.
    computation: UnsafeCell<Option<Pin<Box<dyn Resumable<Output = T>>>>>,

    /// Set once when the computation returns a value.
    result: Mutex<Option<T>>,

    /// The computation panicked instead of returning.
    panicked: AtomicBool,

    state: AtomicU8,

    /// Queue the task goes back to when woken.
    queue: Arc<RunQueue>,

    /// Keeps the scheduler's outstanding count up until completion.
    guard: Mutex<Option<CountGuard>>,

    /// Wakers of `JoinHandle`s awaiting this task.
    waiters: Mutex<Vec<Waker>>,
}

// SAFETY: `computation` is only accessed by the single context holding the
// `Running` state; the other fields are synchronised.
unsafe impl<T: Send> Send for Task<T> {}
unsafe impl<T: Send> Sync for Task<T> {}

impl<T: Send + 'static> Task<T> {
    /// Creates a task in the `Queued` state. The caller enqueues it.
    pub(crate) fn new<R>(computation: R, queue: Arc<RunQueue>, guard: CountGuard) -> Arc<Self>
    where
        R: Resumable<Output = T>,
    {
        Arc::new(Self {
            computation: UnsafeCell::new(Some(Box::pin(computation))),
            result: Mutex::new(None),
            panicked: AtomicBool::new(false),
            state: AtomicU8::new(State::Queued as u8),
            queue,
            guard: Mutex::new(Some(guard)),
            waiters: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn state(&self) -> State {
        State::from_u8(self.state.load(Ordering::Acquire))
    }

    fn transition(&self, from: State, to: State) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Resumes the computation once.
    pub(crate) fn run(self: Arc<Self>) {
        if !self.transition(State::Queued, State::Running) {
            return;
        }

        let waker = Waker::from(self.clone());
        let mut cx = Context::from_waker(&waker);

        // SAFETY: the `Running` state grants exclusive access.
        let computation = unsafe { &mut *self.computation.get() };
        let Some(inner) = computation.as_mut() else {
            return;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| inner.as_mut().resume(&mut cx)));

        match outcome {
            Ok(Poll::Pending) => {
                if !self.transition(State::Running, State::Idle) {
                    // Woken while running.
                    self.state.store(State::Queued as u8, Ordering::Release);
                    self.queue.push(self.clone());
                }
            }
            Ok(Poll::Ready(value)) => {
                *self.result.lock() = Some(value);
                self.complete(computation);
            }
            Err(payload) => {
                tracing::error!(panic = panic_message(&*payload), "task panicked");
                self.panicked.store(true, Ordering::Release);
                self.complete(computation);
            }
        }
    }

    fn complete(&self, computation: &mut Option<Pin<Box<dyn Resumable<Output = T>>>>) {
        // Owned resources and the outstanding count are released before
        // anyone can observe completion.
        drop(computation.take());
        drop(self.guard.lock().take());

        let waiters = {
            let mut waiters = self.waiters.lock();
            self.state.store(State::Completed as u8, Ordering::Release);
            std::mem::take(&mut *waiters)
        };

        for waker in waiters {
            waker.wake();
        }
    }

    /// Re-queues the task after a wake-up.
    pub(crate) fn schedule(self: &Arc<Self>) {
        loop {
            match self.state() {
                State::Idle => {
                    if self.transition(State::Idle, State::Queued) {
                        self.queue.push(self.clone());
                        return;
                    }
                }
                State::Running => {
                    if self.transition(State::Running, State::Notified) {
                        return;
                    }
                }
                State::Queued | State::Notified | State::Completed => return,
            }
        }
    }

    /// Takes the result if the task finished, otherwise registers `waker`.
    ///
    /// Returns `Some(None)` when the task finished without a value to hand
    /// out: it panicked, or the value was already taken.
    pub(crate) fn poll_result(&self, waker: &Waker) -> Option<Option<T>> {
        {
            let mut waiters = self.waiters.lock();
            if self.state() != State::Completed {
                if !waiters.iter().any(|w| w.will_wake(waker)) {
                    waiters.push(waker.clone());
                }
                return None;
            }
        }

        Some(self.result.lock().take())
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.state() == State::Completed
    }

    pub(crate) fn panicked(&self) -> bool {
        self.panicked.load(Ordering::Acquire)
    }
}

impl<T: Send + 'static> Runnable for Task<T> {
    fn run(self: Arc<Self>) {
        Task::run(self)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "Box<dyn Any>"
    }
}

/// Spawns a computation onto the scheduler of the current context.
///
/// # Panics
///
/// Panics when called outside a scheduler, or once that scheduler has
/// started shutting down.
///
/// # Examples
///
/// ```rust,ignore
/// let handle = corio::task::spawn(async { 40 + 2 });
/// assert_eq!(handle.await, 42);
/// ```
pub fn spawn<R>(computation: R) -> JoinHandle<R::Output>
where
    R: Resumable,
{
    Handle::current()
        .spawn(computation)
        .expect("spawn called on a scheduler that is shutting down")
}
