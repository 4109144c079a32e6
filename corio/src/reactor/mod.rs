//! Reactor core and event handling.
//!
//! The reactor drives I/O readiness and timers and wakes the tasks waiting
//! on them. It either runs on a dedicated thread or is driven by the caller
//! of [`Scheduler::run_once`](crate::Scheduler::run_once).
//!
//! Tasks talk to it through [`Command`](command::Command)s sent over a
//! [`ReactorHandle`]; every registration, timer and readiness decision
//! happens on the reactor side.

mod core;
mod timer;

pub(crate) mod command;
pub(crate) mod event;
pub(crate) mod io;
pub(crate) mod poller;

pub(crate) use core::{Reactor, ReactorHandle};
