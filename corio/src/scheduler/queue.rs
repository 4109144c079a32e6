use crate::reactor::ReactorHandle;
use crate::scheduler::task::Runnable;

use crossbeam_deque::{Injector, Steal, Worker};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Global run queue shared by every worker context of a scheduler.
///
/// Newly scheduled and woken tasks land here. Workers move batches into
/// their local deques; a caller-driven scheduler pops straight from it.
///
/// Parking uses a condition variable. Pushers take the park lock before
/// notifying, so a worker that found the queue empty cannot miss the
/// notification that follows.
pub(crate) struct RunQueue {
    injector: Injector<Arc<dyn Runnable>>,

    lock: Mutex<()>,
    condvar: Condvar,

    /// Set once the scheduler has drained; later pushes are discarded.
    closed: AtomicBool,

    /// Reactor to interrupt on push when no worker thread exists.
    unpark_reactor: Option<ReactorHandle>,
}

impl RunQueue {
    pub(crate) fn new(unpark_reactor: Option<ReactorHandle>) -> Self {
        Self {
            injector: Injector::new(),
            lock: Mutex::new(()),
            condvar: Condvar::new(),
            closed: AtomicBool::new(false),
            unpark_reactor,
        }
    }

    /// Enqueues a runnable task and wakes one idle worker context.
    pub(crate) fn push(&self, task: Arc<dyn Runnable>) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }

        self.injector.push(task);

        drop(self.lock.lock());
        self.condvar.notify_one();

        if let Some(reactor) = &self.unpark_reactor {
            reactor.wake();
        }
    }

    /// Pops one task directly from the global queue.
    pub(crate) fn pop(&self) -> Option<Arc<dyn Runnable>> {
        loop {
            match self.injector.steal() {
                Steal::Success(task) => return Some(task),
                Steal::Empty => return None,
                Steal::Retry => continue,
            }
        }
    }

    /// Moves a batch into `local` and returns one task of it.
    pub(crate) fn pop_into(&self, local: &Worker<Arc<dyn Runnable>>) -> Option<Arc<dyn Runnable>> {
        loop {
            match self.injector.steal_batch_and_pop(local) {
                Steal::Success(task) => return Some(task),
                Steal::Empty => return None,
                Steal::Retry => continue,
            }
        }
    }

    /// Blocks the calling worker until a push, a close, or `timeout`.
    pub(crate) fn park(&self, timeout: Duration) {
        let mut guard = self.lock.lock();

        if !self.injector.is_empty() || self.is_closed() {
            return;
        }

        self.condvar.wait_for(&mut guard, timeout);
    }

    pub(crate) fn len(&self) -> usize {
        self.injector.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.injector.is_empty()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stops accepting tasks and releases every parked worker.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);

        drop(self.lock.lock());
        self.condvar.notify_all();
    }

    /// Drops whatever is still queued. Returns how many tasks were dropped.
    pub(crate) fn drain(&self) -> usize {
        let mut dropped = 0;
        while self.pop().is_some() {
            dropped += 1;
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;
    use std::time::Instant;

    struct Noop;

    impl Runnable for Noop {
        fn run(self: Arc<Self>) {}
    }

    fn park_in_background(queue: &Arc<RunQueue>) -> thread::JoinHandle<Duration> {
        let queue = queue.clone();
        thread::spawn(move || {
            let start = Instant::now();
            queue.park(Duration::from_secs(10));
            start.elapsed()
        })
    }

    #[test]
    fn push_releases_a_parked_worker() {
        let queue = Arc::new(RunQueue::new(None));
        let parked = park_in_background(&queue);

        thread::sleep(Duration::from_millis(20));
        queue.push(Arc::new(Noop));

        assert!(parked.join().unwrap() < Duration::from_secs(5));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn close_releases_a_parked_worker() {
        let queue = Arc::new(RunQueue::new(None));
        let parked = park_in_background(&queue);

        thread::sleep(Duration::from_millis(20));
        queue.close();

        assert!(parked.join().unwrap() < Duration::from_secs(5));
        assert!(queue.is_closed());
    }

    #[test]
    fn park_returns_at_once_when_work_is_queued() {
        let queue = RunQueue::new(None);
        queue.push(Arc::new(Noop));

        let start = Instant::now();
        queue.park(Duration::from_secs(10));

        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
