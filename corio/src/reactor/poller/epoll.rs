//! Linux `epoll`-based poller implementation.
//!
//! Responsibilities:
//! - Register file descriptors with read/write interests
//! - Block waiting for I/O readiness
//! - Wake up early when new commands are submitted
//! - Honour the reactor's timer-driven wait bound
//!
//! Registrations are level-triggered and keyed by the descriptor itself,
//! so one descriptor maps to exactly one `epoll` entry carrying the union of
//! its outstanding interests.

use super::common::{Interest, Waker};
use super::platform::sys_close;
use crate::reactor::event::Event;

use libc::{
    EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD, EPOLLERR, EPOLLHUP, EPOLLIN,
    EPOLLOUT, EPOLLRDHUP, epoll_create1, epoll_ctl, epoll_event, epoll_wait,
};
use std::io;
use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::time::Duration;

/// Reserved token used internally for the wake-up event.
///
/// Descriptors are non-negative, so `u64::MAX` never collides with one.
const WAKE_TOKEN: u64 = u64::MAX;

/// Number of events fetched per `epoll_wait` call.
const EVENT_CAPACITY: usize = 256;

/// Linux `epoll` poller.
pub(crate) struct EpollPoller {
    /// Epoll file descriptor.
    epoll: RawFd,

    /// Reusable buffer for raw epoll events.
    events: Vec<epoll_event>,

    /// Eventfd used to interrupt `epoll_wait`.
    waker: Arc<Waker>,
}

// SAFETY: the raw event buffer is only touched through `&mut self`.
unsafe impl Send for EpollPoller {}

impl EpollPoller {
    /// Creates the epoll instance and registers its wake-up eventfd.
    pub(crate) fn new() -> io::Result<Self> {
        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }

        let waker = match Waker::new() {
            Ok(waker) => waker,
            Err(e) => {
                sys_close(epoll);
                return Err(e);
            }
        };

        let mut event = epoll_event {
            events: EPOLLIN as u32,
            u64: WAKE_TOKEN,
        };

        let rc = unsafe { epoll_ctl(epoll, EPOLL_CTL_ADD, waker.fd(), &mut event) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            sys_close(epoll);
            return Err(err);
        }

        Ok(Self {
            epoll,
            events: Vec::with_capacity(EVENT_CAPACITY),
            waker: Arc::new(waker),
        })
    }

    /// Returns the poller waker.
    pub(crate) fn waker(&self) -> Arc<Waker> {
        self.waker.clone()
    }

    /// Adds a descriptor to the interest list.
    pub(crate) fn register(&self, fd: RawFd, interest: Interest) -> io::Result<()> {
        self.ctl(EPOLL_CTL_ADD, fd, interest)
    }

    /// Updates the interest of an already registered descriptor.
    pub(crate) fn reregister(&self, fd: RawFd, interest: Interest) -> io::Result<()> {
        self.ctl(EPOLL_CTL_MOD, fd, interest)
    }

    /// Removes a descriptor from the interest list.
    ///
    /// Failure is ignored: a descriptor that was already closed has been
    /// dropped from the interest list by the kernel.
    pub(crate) fn deregister(&self, fd: RawFd) {
        unsafe {
            epoll_ctl(self.epoll, EPOLL_CTL_DEL, fd, std::ptr::null_mut());
        }
    }

    fn ctl(&self, op: i32, fd: RawFd, interest: Interest) -> io::Result<()> {
        let mut flags = 0;

        // Peer half-close only concerns readers.
        if interest.read {
            flags |= EPOLLIN | EPOLLRDHUP;
        }
        if interest.write {
            flags |= EPOLLOUT;
        }

        let mut event = epoll_event {
            events: flags as u32,
            u64: fd as u64,
        };

        let rc = unsafe { epoll_ctl(self.epoll, op, fd, &mut event) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    /// Polls for readiness events.
    ///
    /// Blocks until a registered descriptor becomes ready, the waker fires,
    /// or `timeout` elapses (`None` waits forever). An interrupted wait is
    /// reported as an empty, successful poll.
    pub(crate) fn poll(
        &mut self,
        events: &mut Vec<Event>,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        events.clear();

        let timeout_ms = timeout
            .map(|t| t.as_nanos().div_ceil(1_000_000).min(i32::MAX as u128) as i32)
            .unwrap_or(-1);

        let n = unsafe {
            epoll_wait(
                self.epoll,
                self.events.as_mut_ptr(),
                self.events.capacity() as i32,
                timeout_ms,
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        // SAFETY: the kernel initialised the first `n` entries.
        unsafe {
            self.events.set_len(n as usize);
        }

        for ev in &self.events {
            if ev.u64 == WAKE_TOKEN {
                self.waker.reset();
                continue;
            }

            let flags = ev.events;

            events.push(Event {
                fd: ev.u64 as RawFd,
                readable: flags & EPOLLIN as u32 != 0,
                writable: flags & EPOLLOUT as u32 != 0,
                error: flags & EPOLLERR as u32 != 0,
                closed: flags & EPOLLHUP as u32 != 0,
                read_closed: flags & EPOLLRDHUP as u32 != 0,
            });
        }

        Ok(())
    }
}

impl Drop for EpollPoller {
    fn drop(&mut self) {
        sys_close(self.epoll);
    }
}
