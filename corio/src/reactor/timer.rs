use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::sync::atomic::{self, AtomicBool};
use std::task::Waker;
use std::time::{Duration, Instant};

/// An entry in the reactor timer queue.
///
/// Entries are ordered by deadline, then by insertion sequence, so two
/// timers sharing a deadline fire in the order they were armed.
///
/// The entry may be cancelled before it fires.
pub(crate) struct TimerEntry {
    /// The time at which the timer should fire.
    pub(crate) deadline: Instant,

    /// Insertion sequence, breaks deadline ties.
    pub(crate) seq: u64,

    /// Waker to notify when the deadline is reached.
    pub(crate) waker: Waker,

    /// Cancellation flag shared with the associated sleep future.
    pub(crate) cancelled: Arc<AtomicBool>,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Ord for TimerEntry {
    /// Reversed so that a `BinaryHeap<TimerEntry>` pops the earliest
    /// deadline first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap of pending timers.
#[derive(Default)]
pub(crate) struct Timers {
    heap: BinaryHeap<TimerEntry>,
    next_seq: u64,
}

impl Timers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, deadline: Instant, waker: Waker, cancelled: Arc<AtomicBool>) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);

        self.heap.push(TimerEntry {
            deadline,
            seq,
            waker,
            cancelled,
        });
    }

    /// Time left until the earliest live timer, if any.
    ///
    /// Cancelled entries sitting at the top are discarded on the way.
    pub(crate) fn next_timeout(&mut self, now: Instant) -> Option<Duration> {
        while let Some(top) = self.heap.peek() {
            if top.cancelled.load(atomic::Ordering::Acquire) {
                self.heap.pop();
                continue;
            }
            return Some(top.deadline.saturating_duration_since(now));
        }
        None
    }

    /// Wakes every non-cancelled timer whose deadline is at or before `now`.
    ///
    /// Returns how many wakers were invoked.
    pub(crate) fn fire_expired(&mut self, now: Instant) -> usize {
        let mut fired = 0;

        while self.heap.peek().is_some_and(|t| t.deadline <= now) {
            let Some(timer) = self.heap.pop() else {
                break;
            };

            if timer.cancelled.load(atomic::Ordering::Acquire) {
                continue;
            }

            timer.waker.wake();
            fired += 1;
        }

        fired
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;
    use std::task::Wake;

    struct Recorder {
        id: usize,
        log: Arc<Mutex<Vec<usize>>>,
    }

    impl Wake for Recorder {
        fn wake(self: Arc<Self>) {
            self.log.lock().push(self.id);
        }
    }

    fn recorder(id: usize, log: &Arc<Mutex<Vec<usize>>>) -> Waker {
        Waker::from(Arc::new(Recorder {
            id,
            log: log.clone(),
        }))
    }

    #[test]
    fn equal_deadlines_fire_in_insertion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut timers = Timers::new();
        let deadline = Instant::now();

        for id in 0..4 {
            timers.insert(deadline, recorder(id, &log), Arc::new(AtomicBool::new(false)));
        }

        assert_eq!(timers.fire_expired(deadline), 4);
        assert_eq!(*log.lock(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut timers = Timers::new();
        let now = Instant::now();

        let cancelled = Arc::new(AtomicBool::new(true));
        timers.insert(now, recorder(0, &log), cancelled);
        timers.insert(
            now + Duration::from_secs(60),
            recorder(1, &log),
            Arc::new(AtomicBool::new(false)),
        );

        assert_eq!(timers.fire_expired(now), 0);
        assert!(log.lock().is_empty());

        let left = timers.next_timeout(now).unwrap();
        assert!(left > Duration::from_secs(59));
        assert_eq!(timers.len(), 1);
    }
}
