//! Platform I/O poller.
//!
//! The reactor talks to the operating system readiness notifier through
//! this module only. Linux is served by `epoll`, with an `eventfd` used to
//! interrupt a blocking wait when new commands arrive.

pub(crate) mod common;

pub(crate) use common::{Interest, Waker};

#[cfg(target_os = "linux")]
mod epoll;

#[cfg(target_os = "linux")]
pub(crate) type Poller = epoll::EpollPoller;

#[cfg(unix)]
pub(crate) mod unix;

#[cfg(unix)]
pub(crate) use unix as platform;
