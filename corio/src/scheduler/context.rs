use super::handle::Handle;
use crate::reactor::ReactorHandle;

use std::cell::RefCell;

thread_local! {
    /// Scheduler whose worker context the current thread is running.
    ///
    /// Set for the whole life of a worker thread, and for the duration of
    /// each `run_once` on a caller-driven scheduler.
    static CURRENT: RefCell<Option<Handle>> = const { RefCell::new(None) };
}

/// Restores the previously installed context on drop.
pub(crate) struct EnterGuard {
    previous: Option<Handle>,
}

impl Drop for EnterGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}

/// Installs `handle` as the current scheduler until the guard is dropped.
pub(crate) fn enter(handle: Handle) -> EnterGuard {
    let previous = CURRENT.with(|current| current.borrow_mut().replace(handle));
    EnterGuard { previous }
}

pub(crate) fn try_current() -> Option<Handle> {
    CURRENT.with(|current| current.borrow().clone())
}

/// # Panics
///
/// Panics outside a scheduler's worker context.
pub(crate) fn current() -> Handle {
    try_current().expect("must be called from within a corio scheduler")
}

/// Reactor of the current scheduler.
///
/// # Panics
///
/// Panics outside a scheduler's worker context.
pub(crate) fn reactor() -> ReactorHandle {
    CURRENT.with(|current| {
        current
            .borrow()
            .as_ref()
            .map(|handle| handle.reactor().clone())
            .expect("must be called from within a corio scheduler")
    })
}
