use super::context;
use super::handle::Handle;
use super::task::Runnable;

use crossbeam_deque::{Stealer, Worker as Deque};
use std::sync::Arc;
use std::time::Duration;

/// How long an idle worker sleeps before looking for work again.
///
/// Pushes and close wake parked workers directly. The timeout only bounds
/// how long a batch sitting in a busy worker's deque waits to be stolen.
const PARK_TIMEOUT: Duration = Duration::from_millis(50);

/// A worker context backed by its own thread.
///
/// Lookup order for the next task:
/// 1. the local deque,
/// 2. a batch from the global run queue,
/// 3. a batch stolen from another worker,
/// 4. otherwise park until something is pushed.
pub(crate) struct Worker {
    id: usize,
    local: Deque<Arc<dyn Runnable>>,
    stealers: Arc<[Stealer<Arc<dyn Runnable>>]>,
    handle: Handle,
}

impl Worker {
    /// Creates one worker per id, all sharing each other's stealers.
    pub(crate) fn pool(count: usize, handle: &Handle) -> Vec<Worker> {
        let locals: Vec<_> = (0..count).map(|_| Deque::new_fifo()).collect();
        let stealers: Arc<[_]> = locals.iter().map(Deque::stealer).collect();

        locals
            .into_iter()
            .enumerate()
            .map(|(id, local)| Worker {
                id,
                local,
                stealers: stealers.clone(),
                handle: handle.clone(),
            })
            .collect()
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    /// Runs tasks until the run queue is closed.
    pub(crate) fn run(self) {
        let _enter = context::enter(self.handle.clone());
        let queue = self.handle.shared.queue.clone();

        tracing::trace!(worker = self.id, "worker started");

        loop {
            if let Some(task) = self.next_task() {
                task.run();
                continue;
            }

            if queue.is_closed() {
                break;
            }

            queue.park(PARK_TIMEOUT);
        }

        tracing::trace!(worker = self.id, "worker stopped");
    }

    fn next_task(&self) -> Option<Arc<dyn Runnable>> {
        if let Some(task) = self.local.pop() {
            return Some(task);
        }

        if let Some(task) = self.handle.shared.queue.pop_into(&self.local) {
            return Some(task);
        }

        self.steal()
    }

    /// Visits the other workers round-robin, starting after this one.
    fn steal(&self) -> Option<Arc<dyn Runnable>> {
        let len = self.stealers.len();

        for i in 1..len {
            let victim = (self.id + i) % len;

            loop {
                match self.stealers[victim].steal_batch_and_pop(&self.local) {
                    crossbeam_deque::Steal::Success(task) => return Some(task),
                    crossbeam_deque::Steal::Empty => break,
                    crossbeam_deque::Steal::Retry => continue,
                }
            }
        }

        None
    }
}
