use crate::net::PollOp;
use crate::reactor::io::PollSlot;

use std::os::fd::RawFd;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::task::Waker;
use std::time::Instant;

/// Requests sent from tasks to the reactor.
pub(crate) enum Command {
    /// Wait for `op` readiness on `fd`; the outcome lands in `slot`.
    Register {
        fd: RawFd,
        op: PollOp,
        slot: Arc<PollSlot>,
    },

    /// Drop the registration identified by `slot`, if it is still pending.
    Deregister { fd: RawFd, slot: Arc<PollSlot> },

    /// Wake `waker` once `deadline` passes unless `cancelled` is set first.
    SetTimer {
        deadline: Instant,
        waker: Waker,
        cancelled: Arc<AtomicBool>,
    },

    /// Leave the event loop.
    Shutdown,
}
