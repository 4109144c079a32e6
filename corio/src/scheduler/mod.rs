//! Task scheduling.
//!
//! A [`Scheduler`] owns a reactor and one or more worker contexts. Tasks
//! handed to it are queued, resumed by a worker context, suspended when
//! they wait on readiness or a timer, and resumed again when the reactor
//! wakes them.
//!
//! Two thread strategies exist:
//! - [`ThreadStrategy::Spawn`]: a reactor thread plus a pool of
//!   work-stealing worker threads.
//! - [`ThreadStrategy::Manual`]: nothing runs until the caller drives the
//!   scheduler with [`Scheduler::run_once`] or [`Scheduler::block_on`].

mod builder;
mod handle;
mod queue;
mod worker;

pub(crate) mod context;

pub mod task;

pub use builder::{SchedulerBuilder, ThreadStrategy};
pub use handle::Handle;

use crate::reactor::command::Command;
use crate::reactor::Reactor;
use queue::RunQueue;
use task::JoinHandle;
use task::Resumable;
use worker::Worker;

use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, Wake, Waker};
use std::thread::{self, JoinHandle as ThreadHandle, Thread};
use std::time::Duration;

/// Interval between drain checks while shutting down.
const DRAIN_INTERVAL: Duration = Duration::from_millis(1);

/// Runs tasks on a pool of worker contexts.
///
/// Dropping the scheduler shuts it down.
pub struct Scheduler {
    handle: Handle,
    strategy: ThreadStrategy,

    /// Reactor and worker threads (spawn strategy).
    threads: Mutex<Vec<ThreadHandle<()>>>,

    /// Reactor driven by `run_once` (manual strategy).
    reactor: Mutex<Option<Reactor>>,

    stopped: AtomicBool,
}

impl Scheduler {
    /// Shorthand for `SchedulerBuilder::new()`.
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new()
    }

    fn new(builder: SchedulerBuilder) -> crate::Result<Self> {
        let (reactor, reactor_handle) = Reactor::new()?;

        let unpark = match builder.thread_strategy {
            ThreadStrategy::Spawn => None,
            ThreadStrategy::Manual => Some(reactor_handle.clone()),
        };
        let queue = Arc::new(RunQueue::new(unpark));
        let handle = Handle::new(queue, reactor_handle);

        let scheduler = Self {
            handle,
            strategy: builder.thread_strategy,
            threads: Mutex::new(Vec::new()),
            reactor: Mutex::new(None),
            stopped: AtomicBool::new(false),
        };

        match builder.thread_strategy {
            ThreadStrategy::Manual => {
                *scheduler.reactor.lock() = Some(reactor);
            }
            ThreadStrategy::Spawn => {
                // On error the partially built scheduler is dropped, which
                // stops whatever was already started.
                scheduler.start_threads(reactor, &builder)?;
            }
        }

        tracing::debug!(
            strategy = ?builder.thread_strategy,
            workers = builder.worker_threads,
            "scheduler started"
        );

        Ok(scheduler)
    }

    fn start_threads(&self, reactor: Reactor, builder: &SchedulerBuilder) -> std::io::Result<()> {
        let mut threads = self.threads.lock();

        threads.push(reactor.spawn(format!("{}-reactor", builder.thread_name))?);

        for worker in Worker::pool(builder.worker_threads, &self.handle) {
            let name = format!("{}-worker-{}", builder.thread_name, worker.id());
            threads.push(thread::Builder::new().name(name).spawn(move || worker.run())?);
        }

        Ok(())
    }

    /// Returns a cloneable handle to this scheduler.
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    pub fn thread_strategy(&self) -> ThreadStrategy {
        self.strategy
    }

    /// Takes ownership of `task` and queues its first resumption.
    ///
    /// Returns `false` once the scheduler is shutting down; the task is
    /// dropped without running.
    pub fn schedule<R>(&self, task: R) -> bool
    where
        R: Resumable,
    {
        self.handle.schedule(task)
    }

    /// Like [`schedule`](Self::schedule), returning a handle to the result.
    pub fn spawn<R>(&self, task: R) -> Option<JoinHandle<R::Output>>
    where
        R: Resumable,
    {
        self.handle.spawn(task)
    }

    /// Number of scheduled tasks that have not completed yet.
    pub fn size(&self) -> usize {
        self.handle.size()
    }

    pub fn is_empty(&self) -> bool {
        self.handle.is_empty()
    }

    /// Runs a future to completion on this scheduler, blocking the current
    /// thread.
    ///
    /// With [`ThreadStrategy::Manual`] the calling thread drives the
    /// scheduler while it waits.
    ///
    /// # Panics
    ///
    /// Panics if the scheduler is shutting down, or if the future panics.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let result = scheduler.block_on(async { 42 });
    /// assert_eq!(result, 42);
    /// ```
    pub fn block_on<F>(&self, future: F) -> F::Output
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let join = self
            .spawn(future)
            .expect("block_on called on a scheduler that is shutting down");
        let mut join = pin!(join);

        let waker = Waker::from(Arc::new(ThreadWaker(thread::current())));
        let mut cx = Context::from_waker(&waker);

        loop {
            if let Poll::Ready(value) = join.as_mut().poll(&mut cx) {
                return value;
            }

            match self.strategy {
                ThreadStrategy::Spawn => thread::park(),
                ThreadStrategy::Manual => {
                    self.run_once(None);
                }
            }
        }
    }

    /// Drives a caller-driven scheduler by one step.
    ///
    /// Runs one reactor turn, waiting at most `max_wait` (`None` waits for
    /// the next event or timer) unless tasks are already ready, then resumes
    /// the tasks that were ready. Returns how many tasks were resumed.
    ///
    /// Has no effect with [`ThreadStrategy::Spawn`] and returns `0`.
    pub fn run_once(&self, max_wait: Option<Duration>) -> usize {
        let mut reactor = self.reactor.lock();
        let Some(reactor) = reactor.as_mut() else {
            return 0;
        };

        let _enter = context::enter(self.handle.clone());
        let queue = &self.handle.shared.queue;

        let wait = if queue.is_empty() {
            max_wait
        } else {
            Some(Duration::ZERO)
        };
        reactor.turn(wait);

        let budget = queue.len();
        let mut ran = 0;

        while ran < budget {
            let Some(task) = queue.pop() else {
                break;
            };
            task.run();
            ran += 1;
        }

        ran
    }

    /// Stops the scheduler.
    ///
    /// New tasks are rejected, accept loops are told to stop, and already
    /// scheduled tasks are allowed to finish before the reactor and the
    /// worker contexts halt. Calling it again has no effect.
    pub fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        self.handle.begin_shutdown();

        while !self.handle.is_drained() {
            match self.strategy {
                ThreadStrategy::Spawn => thread::sleep(DRAIN_INTERVAL),
                ThreadStrategy::Manual => {
                    self.run_once(Some(DRAIN_INTERVAL));
                }
            }
        }

        let queue = &self.handle.shared.queue;
        queue.close();

        if self.handle.reactor().send(Command::Shutdown).is_err() {
            tracing::warn!("reactor already stopped");
        }

        for thread in self.threads.lock().drain(..) {
            if thread.join().is_err() {
                tracing::error!("scheduler thread panicked");
            }
        }

        self.reactor.lock().take();

        let dropped = queue.drain();
        tracing::debug!(dropped, "scheduler shut down");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("strategy", &self.strategy)
            .field("size", &self.size())
            .finish()
    }
}

/// Unparks the thread blocked in `block_on`.
struct ThreadWaker(Thread);

impl Wake for ThreadWaker {
    fn wake(self: Arc<Self>) {
        self.0.unpark();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.0.unpark();
    }
}
