//! Resumable computations and their handles.
//!
//! A computation becomes a task when it is handed to a scheduler. The
//! scheduler owns it from then on, resumes it whenever its waker fires,
//! and hands its value to the [`JoinHandle`] once it completes.
//!
//! - [`Resumable`]: what the scheduler can run.
//! - [`spawn`]: schedule onto the current scheduler.
//! - [`Generator`] / [`Yielder`]: computations producing a sequence.
//! - [`yield_now`]: explicit cooperative yield point.

mod contract;
mod core;
mod generator;
mod handle;
mod state;
mod waker;
mod yield_now;

pub(crate) use core::{Runnable, Task};

pub use contract::Resumable;
pub use core::spawn;
pub use generator::{Generator, YieldValue, Yielder};
pub use handle::JoinHandle;
pub use yield_now::yield_now;
