use crate::reactor::command::Command;
use crate::scheduler::context;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Creates a future that completes after the given duration.
///
/// # Panics
///
/// The returned future panics if polled outside of a scheduler.
///
/// # Examples
///
/// ```rust,ignore
/// use std::time::Duration;
///
/// corio::time::sleep(Duration::from_millis(10)).await;
/// ```
pub fn sleep(duration: Duration) -> Sleep {
    sleep_until(Instant::now() + duration)
}

/// Creates a future that completes once `deadline` is reached.
pub fn sleep_until(deadline: Instant) -> Sleep {
    Sleep {
        deadline,
        registered: false,
        cancelled: Arc::new(AtomicBool::new(false)),
    }
}

/// A future that completes once a specific deadline is reached.
///
/// The timer is armed on the reactor at first poll and cancelled when the
/// future is dropped, so an abandoned `Sleep` never wakes its task.
#[derive(Debug)]
pub struct Sleep {
    deadline: Instant,
    registered: bool,

    /// Cancellation flag shared with the reactor.
    cancelled: Arc<AtomicBool>,
}

impl Sleep {
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_elapsed(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if this.is_elapsed() {
            return Poll::Ready(());
        }

        if !this.registered {
            this.registered = true;

            let command = Command::SetTimer {
                deadline: this.deadline,
                waker: cx.waker().clone(),
                cancelled: this.cancelled.clone(),
            };

            if context::reactor().send(command).is_err() {
                tracing::warn!("reactor stopped, sleep completes early");
                return Poll::Ready(());
            }
        }

        Poll::Pending
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
    }
}
