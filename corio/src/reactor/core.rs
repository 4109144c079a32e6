use super::command::Command;
use super::event::Event;
use super::io::Registrations;
use super::poller::{Poller, Waker};
use super::timer::Timers;

use std::io;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, SendError, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Number of readiness events a single turn can observe.
const EVENT_CAPACITY: usize = 64;

/// Event loop owning the poller, the timer heap and the registration table.
///
/// All three are touched only from the thread that drives the reactor.
/// Other threads reach it through a [`ReactorHandle`].
pub(crate) struct Reactor {
    receiver: Receiver<Command>,

    poller: Poller,
    events: Vec<Event>,

    timers: Timers,
    registrations: Registrations,
}

/// Cloneable sending side of a reactor.
///
/// Every command interrupts the poller so that it is picked up without
/// waiting for the current wait to expire.
#[derive(Clone)]
pub(crate) struct ReactorHandle {
    sender: Sender<Command>,
    waker: Arc<Waker>,
}

impl ReactorHandle {
    pub(crate) fn send(&self, command: Command) -> Result<(), SendError<Command>> {
        self.sender.send(command)?;
        self.waker.wake();
        Ok(())
    }

    /// Interrupts the reactor's current or next wait.
    pub(crate) fn wake(&self) {
        self.waker.wake();
    }
}

impl Reactor {
    pub(crate) fn new() -> io::Result<(Self, ReactorHandle)> {
        let (sender, receiver) = channel();
        let poller = Poller::new()?;
        let waker = poller.waker();

        let reactor = Self {
            receiver,
            poller,
            events: Vec::with_capacity(EVENT_CAPACITY),
            timers: Timers::new(),
            registrations: Registrations::new(),
        };

        Ok((reactor, ReactorHandle { sender, waker }))
    }

    /// Moves the reactor onto its own thread and drives it until shutdown.
    pub(crate) fn spawn(mut self, name: String) -> io::Result<JoinHandle<()>> {
        thread::Builder::new().name(name).spawn(move || {
            tracing::trace!("reactor started");
            while self.turn(None) {}
            tracing::trace!("reactor stopped");
        })
    }

    /// Runs one iteration of the event loop.
    ///
    /// Applies pending commands, waits for readiness or the next timer
    /// (bounded by `max_wait`), then dispatches events and expired timers.
    /// Returns `false` once a shutdown was requested or every handle is gone.
    pub(crate) fn turn(&mut self, max_wait: Option<Duration>) -> bool {
        if !self.apply_commands() {
            return false;
        }

        let wait = match (self.timers.next_timeout(Instant::now()), max_wait) {
            (Some(timer), Some(max)) => Some(timer.min(max)),
            (timer, max) => timer.or(max),
        };

        if let Err(err) = self.poller.poll(&mut self.events, wait) {
            tracing::error!(error = %err, "reactor poll failed");
            return true;
        }

        for event in &self.events {
            self.registrations.dispatch(&self.poller, event);
        }

        self.timers.fire_expired(Instant::now());

        true
    }

    fn apply_commands(&mut self) -> bool {
        loop {
            let command = match self.receiver.try_recv() {
                Ok(command) => command,
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            };

            match command {
                Command::Register { fd, op, slot } => {
                    self.registrations.insert(&self.poller, fd, op, slot);
                }
                Command::Deregister { fd, slot } => {
                    self.registrations.remove(&self.poller, fd, &slot);
                }
                Command::SetTimer {
                    deadline,
                    waker,
                    cancelled,
                } => {
                    self.timers.insert(deadline, waker, cancelled);
                }
                Command::Shutdown => return false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::net::{PollOp, PollStatus};
    use crate::reactor::io::PollSlot;

    use std::io::Write;
    use std::os::fd::AsRawFd;
    use std::os::unix::net::UnixStream;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn turn_completes_read_registration() {
        let (mut reactor, handle) = Reactor::new().unwrap();
        let (a, mut b) = UnixStream::pair().unwrap();

        let slot = PollSlot::new();
        handle
            .send(Command::Register {
                fd: a.as_raw_fd(),
                op: PollOp::Read,
                slot: slot.clone(),
            })
            .unwrap();

        b.write_all(b"x").unwrap();

        assert!(reactor.turn(Some(Duration::from_secs(1))));
        assert_eq!(
            slot.take_or_park(std::task::Waker::noop()),
            Some(PollStatus::Event)
        );
        assert_eq!(reactor.registrations.len(), 0);
    }

    #[test]
    fn turn_honours_max_wait_and_timers() {
        let (mut reactor, handle) = Reactor::new().unwrap();

        handle
            .send(Command::SetTimer {
                deadline: Instant::now() + Duration::from_secs(30),
                waker: std::task::Waker::noop().clone(),
                cancelled: Arc::new(AtomicBool::new(false)),
            })
            .unwrap();

        let start = Instant::now();
        assert!(reactor.turn(Some(Duration::from_millis(10))));
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(reactor.timers.len(), 1);
    }

    #[test]
    fn shutdown_stops_the_loop() {
        let (reactor, handle) = Reactor::new().unwrap();
        let thread = reactor.spawn("corio-reactor-test".into()).unwrap();

        handle.send(Command::Shutdown).unwrap();
        thread.join().unwrap();
    }
}
