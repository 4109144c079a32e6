use parking_lot::Mutex;
use std::fmt;
use std::future::{Future, poll_fn};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// A computation that yields a sequence of values.
///
/// The body runs inline, inside whichever task calls [`next`](Self::next):
/// it executes until it yields a value or suspends on I/O, and it is not
/// resumed again until the consumer asks for the next value.
///
/// # Examples
///
/// ```rust,ignore
/// let mut numbers = Generator::new(|y| async move {
///     for i in 0..3 {
///         y.yield_value(i).await;
///     }
/// });
///
/// while let Some(n) = numbers.next().await {
///     println!("{n}");
/// }
/// ```
pub struct Generator<T> {
    slot: Arc<Mutex<Option<T>>>,
    body: Option<Pin<Box<dyn Future<Output = ()> + Send>>>,
}

/// Handed to a [`Generator`] body to emit values.
pub struct Yielder<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T: Send + 'static> Generator<T> {
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: FnOnce(Yielder<T>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let slot = Arc::new(Mutex::new(None));
        let yielder = Yielder { slot: slot.clone() };

        Self {
            slot,
            body: Some(Box::pin(body(yielder))),
        }
    }

    /// Resumes the body until it yields the next value or finishes.
    pub async fn next(&mut self) -> Option<T> {
        poll_fn(|cx| self.poll_next(cx)).await
    }

    pub fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let Some(body) = self.body.as_mut() else {
            return Poll::Ready(None);
        };

        let finished = body.as_mut().poll(cx).is_ready();
        if finished {
            self.body = None;
        }

        match self.slot.lock().take() {
            Some(value) => Poll::Ready(Some(value)),
            None if finished => Poll::Ready(None),
            None => Poll::Pending,
        }
    }

    /// Returns `true` once the body ran to completion.
    pub fn is_finished(&self) -> bool {
        self.body.is_none()
    }
}

impl<T> fmt::Debug for Generator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("finished", &self.body.is_none())
            .finish()
    }
}

impl<T> Yielder<T> {
    /// Hands `value` to the consumer and suspends the body until the next
    /// value is requested.
    pub fn yield_value(&self, value: T) -> YieldValue<'_, T> {
        YieldValue {
            yielder: self,
            value: Some(value),
        }
    }
}

/// Future returned by [`Yielder::yield_value`].
#[must_use = "values are only yielded when awaited"]
pub struct YieldValue<'a, T> {
    yielder: &'a Yielder<T>,
    value: Option<T>,
}

// The value is moved out by `take`, never pinned.
impl<T> Unpin for YieldValue<'_, T> {}

impl<T> Future for YieldValue<'_, T> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();

        match this.value.take() {
            Some(value) => {
                *this.yielder.slot.lock() = Some(value);
                Poll::Pending
            }
            None => Poll::Ready(()),
        }
    }
}
