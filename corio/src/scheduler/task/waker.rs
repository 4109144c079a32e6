use super::Task;

use std::sync::Arc;
use std::task::Wake;

/// Waking a task puts it back on its scheduler's run queue.
///
/// Wakes that arrive while the task is running are folded into a single
/// re-queue at the end of the run; wakes of a queued or completed task are
/// no-ops.
impl<T: Send + 'static> Wake for Task<T> {
    fn wake(self: Arc<Self>) {
        self.schedule();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.schedule();
    }
}
