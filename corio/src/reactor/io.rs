use crate::net::{PollOp, PollStatus};
use crate::reactor::event::Event;
use crate::reactor::poller::{Interest, Poller};

use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::io;
use std::os::fd::RawFd;
use std::sync::Arc;
use std::task::Waker;

/// Rendezvous between one pending poll and the reactor.
///
/// The reactor writes the outcome at most once; the polling future reads
/// it and keeps the waker current.
#[derive(Debug, Default)]
pub(crate) struct PollSlot {
    state: Mutex<SlotState>,
}

#[derive(Debug, Default)]
struct SlotState {
    status: Option<PollStatus>,
    waker: Option<Waker>,
}

impl PollSlot {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Records `status` and wakes the waiting task.
    ///
    /// Only the first completion counts; later ones are ignored.
    pub(crate) fn complete(&self, status: PollStatus) {
        let waker = {
            let mut state = self.state.lock();
            if state.status.is_some() {
                return;
            }
            state.status = Some(status);
            state.waker.take()
        };

        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Returns the outcome if there is one, otherwise remembers `waker`.
    pub(crate) fn take_or_park(&self, waker: &Waker) -> Option<PollStatus> {
        let mut state = self.state.lock();

        if state.status.is_some() {
            return state.status;
        }

        match &state.waker {
            Some(current) if current.will_wake(waker) => {}
            _ => state.waker = Some(waker.clone()),
        }

        None
    }
}

/// Outstanding waiters of one descriptor.
#[derive(Default)]
struct Waiters {
    read: Option<Arc<PollSlot>>,
    write: Option<Arc<PollSlot>>,
}

impl Waiters {
    fn slot_mut(&mut self, op: PollOp) -> &mut Option<Arc<PollSlot>> {
        match op {
            PollOp::Read => &mut self.read,
            PollOp::Write => &mut self.write,
        }
    }

    fn interest(&self) -> Interest {
        Interest {
            read: self.read.is_some(),
            write: self.write.is_some(),
        }
    }
}

/// Picks the outcome for one direction out of a raw event.
///
/// Readiness wins over error, error wins over hang-up. A peer half-close
/// only closes the read direction.
fn classify(event: &Event, op: PollOp) -> Option<PollStatus> {
    let (ready, closed) = match op {
        PollOp::Read => (event.readable, event.closed || event.read_closed),
        PollOp::Write => (event.writable, event.closed),
    };

    if ready {
        Some(PollStatus::Event)
    } else if event.error {
        Some(PollStatus::Error)
    } else if closed {
        Some(PollStatus::Closed)
    } else {
        None
    }
}

/// Installs `interest` for `fd`, falling back between `ADD` and `MOD` when
/// the kernel's view differs from the table's.
fn apply(poller: &Poller, fd: RawFd, interest: Interest, existed: bool) -> io::Result<()> {
    let result = if existed {
        poller.reregister(fd, interest)
    } else {
        poller.register(fd, interest)
    };

    match result {
        Err(err) if existed && err.raw_os_error() == Some(libc::ENOENT) => {
            poller.register(fd, interest)
        }
        Err(err) if !existed && err.raw_os_error() == Some(libc::EEXIST) => {
            poller.reregister(fd, interest)
        }
        other => other,
    }
}

/// Readiness registration table.
///
/// Owned by the reactor; the only structure that mirrors the poller's
/// interest list. Every mutation keeps the two in sync.
#[derive(Default)]
pub(crate) struct Registrations {
    entries: HashMap<RawFd, Waiters>,
}

impl Registrations {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Number of descriptors with at least one pending waiter.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Registers `slot` as the `op` waiter of `fd`.
    pub(crate) fn insert(&mut self, poller: &Poller, fd: RawFd, op: PollOp, slot: Arc<PollSlot>) {
        let (existed, waiters) = match self.entries.entry(fd) {
            Entry::Occupied(entry) => (true, entry.into_mut()),
            Entry::Vacant(entry) => (false, entry.insert(Waiters::default())),
        };

        if let Some(displaced) = waiters.slot_mut(op).replace(slot) {
            tracing::warn!(fd, ?op, "poll registration displaced by a newer one");
            displaced.complete(PollStatus::Error);
        }

        let result = apply(poller, fd, waiters.interest(), existed);

        if let Err(err) = result {
            tracing::warn!(fd, ?op, error = %err, "failed to register interest");

            if let Some(slot) = waiters.slot_mut(op).take() {
                slot.complete(PollStatus::Error);
            }

            if existed {
                self.sync(poller, fd);
            } else {
                self.entries.remove(&fd);
            }
        }
    }

    /// Removes `slot` from `fd` if it is still the pending `op` waiter.
    pub(crate) fn remove(&mut self, poller: &Poller, fd: RawFd, slot: &Arc<PollSlot>) {
        let Some(waiters) = self.entries.get_mut(&fd) else {
            return;
        };

        let mut removed = false;
        for op in [PollOp::Read, PollOp::Write] {
            let current = waiters.slot_mut(op);
            if current.as_ref().is_some_and(|s| Arc::ptr_eq(s, slot)) {
                *current = None;
                removed = true;
            }
        }

        if removed {
            self.sync(poller, fd);
        }
    }

    /// Completes every waiter the event satisfies.
    pub(crate) fn dispatch(&mut self, poller: &Poller, event: &Event) {
        let Some(waiters) = self.entries.get_mut(&event.fd) else {
            poller.deregister(event.fd);
            return;
        };

        let mut fired = false;

        for op in [PollOp::Read, PollOp::Write] {
            let slot = waiters.slot_mut(op);
            if slot.is_none() {
                continue;
            }

            if let Some(status) = classify(event, op) {
                if let Some(slot) = slot.take() {
                    slot.complete(status);
                    fired = true;
                }
            }
        }

        if fired {
            self.sync(poller, event.fd);
        }
    }

    /// Pushes the current interest of `fd` down to the poller.
    fn sync(&mut self, poller: &Poller, fd: RawFd) {
        let Some(waiters) = self.entries.get(&fd) else {
            return;
        };

        let interest = waiters.interest();

        if interest.is_empty() {
            self.entries.remove(&fd);
            poller.deregister(fd);
            return;
        }

        if let Err(err) = apply(poller, fd, interest, true) {
            tracing::warn!(fd, error = %err, "failed to update interest");

            if let Some(waiters) = self.entries.remove(&fd) {
                for slot in [waiters.read, waiters.write].into_iter().flatten() {
                    slot.complete(PollStatus::Error);
                }
            }
            poller.deregister(fd);
        }
    }
}
