use super::platform::{RawFd, sys_close, sys_eventfd, sys_eventfd_drain, sys_eventfd_signal};

use std::io;

/// Readiness directions a descriptor is registered for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Interest {
    pub(crate) read: bool,
    pub(crate) write: bool,
}

impl Interest {
    /// Returns `true` when neither direction is requested.
    pub(crate) fn is_empty(self) -> bool {
        !self.read && !self.write
    }
}

/// Wakes a poller blocked in its wait call.
///
/// Backed by an `eventfd` registered with the poller; any thread may
/// signal it.
#[derive(Debug)]
pub(crate) struct Waker(RawFd);

impl Waker {
    pub(crate) fn new() -> io::Result<Self> {
        sys_eventfd().map(Waker)
    }

    pub(crate) fn fd(&self) -> RawFd {
        self.0
    }

    /// Interrupts the poller's current or next wait.
    pub(crate) fn wake(&self) {
        sys_eventfd_signal(self.0);
    }

    /// Clears a pending wake-up. Called by the poller when it observes one.
    pub(crate) fn reset(&self) {
        sys_eventfd_drain(self.0);
    }
}

impl Drop for Waker {
    fn drop(&mut self) {
        sys_close(self.0);
    }
}

impl std::os::fd::AsRawFd for Waker {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}
