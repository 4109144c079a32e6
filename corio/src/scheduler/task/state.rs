/// Lifecycle of a scheduled task.
///
/// `Idle -> Queued -> Running -> (Idle | Notified | Completed)`;
/// `Notified` goes back to `Queued` as soon as the current run ends.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    /// Suspended, waiting for a wake-up.
    Idle = 0,

    /// Sitting in a run queue.
    Queued = 1,

    /// Being resumed by a worker context. At most one at a time.
    Running = 2,

    /// Woken while running; must be re-queued once the run ends.
    Notified = 3,

    /// Finished, with or without a value. Never resumed again.
    Completed = 4,
}

impl State {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => State::Idle,
            1 => State::Queued,
            2 => State::Running,
            3 => State::Notified,
            _ => State::Completed,
        }
    }
}
