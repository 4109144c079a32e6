//! Timers.
//!
//! - [`sleep`] / [`sleep_until`] suspend the current task on a reactor
//!   timer,
//! - [`timeout`] bounds another future by a deadline.

mod sleep;
mod timeout;

#[doc(inline)]
pub use sleep::{Sleep, sleep, sleep_until};

#[doc(inline)]
pub use timeout::{Elapsed, Timeout, timeout};
