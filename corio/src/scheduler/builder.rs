use super::Scheduler;

use std::thread;

/// Where a scheduler's worker contexts run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ThreadStrategy {
    /// One reactor thread plus `worker_threads` worker threads.
    #[default]
    Spawn,

    /// No threads at all: the caller drives the scheduler through
    /// [`Scheduler::run_once`] or [`Scheduler::block_on`].
    Manual,
}

/// Builder for configuring and creating a [`Scheduler`].
///
/// # Examples
///
/// ```rust,ignore
/// let scheduler = SchedulerBuilder::new()
///     .worker_threads(4)
///     .build()?;
/// ```
#[derive(Clone, Debug)]
pub struct SchedulerBuilder {
    pub(crate) worker_threads: usize,
    pub(crate) thread_strategy: ThreadStrategy,
    pub(crate) thread_name: String,
}

impl SchedulerBuilder {
    /// Creates a builder with default configuration.
    ///
    /// By default, the number of worker threads is set to the number
    /// of available logical CPUs, falling back to `1` if unavailable.
    pub fn new() -> Self {
        let worker_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            worker_threads,
            thread_strategy: ThreadStrategy::Spawn,
            thread_name: "corio".to_owned(),
        }
    }

    /// Sets the number of worker threads.
    ///
    /// Ignored by [`ThreadStrategy::Manual`].
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn worker_threads(mut self, n: usize) -> Self {
        assert!(n > 0, "worker_threads must be > 0");

        self.worker_threads = n;
        self
    }

    pub fn thread_strategy(mut self, strategy: ThreadStrategy) -> Self {
        self.thread_strategy = strategy;
        self
    }

    /// Prefix of the names given to spawned threads.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Builds the scheduler, starting its threads if any.
    pub fn build(self) -> crate::Result<Scheduler> {
        Scheduler::new(self)
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
