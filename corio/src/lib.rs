//! # Corio
//!
//! **Corio** is a small cooperative runtime for asynchronous network I/O.
//! A scheduler multiplexes many in-flight socket operations over a few
//! threads; each operation is a task that suspends while it waits for
//! readiness and resumes when the reactor reports an event, a timeout, an
//! error or a hang-up.
//!
//! It offers:
//!
//! - A **scheduler** with a work-stealing thread pool, or a caller-driven
//!   mode running on the current thread
//! - A **readiness poller** with per-call deadlines
//! - An asynchronous **resolver**, a **connector**, and **TCP client and
//!   server** sessions built on them
//! - **Timer primitives**: sleep and timeout
//! - `#[corio::main]` and `#[corio::test]`
//!
//! Linux only (`epoll`).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use corio::net::{ServerOptions, TcpServer};
//! use std::time::Duration;
//!
//! fn main() -> corio::Result<()> {
//!     let server = TcpServer::new(ServerOptions::default().on_connection(|_, socket| async move {
//!         let mut buffer = [0u8; 1024];
//!         let (_, n) = socket.recv(&mut buffer, Duration::from_secs(5)).await;
//!         socket.send(&buffer[..n], Duration::from_secs(5)).await;
//!     }))?;
//!
//!     std::thread::sleep(Duration::from_secs(60));
//!     server.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`task`]: Resumable computations, join handles, generators
//! - [`net`]: Readiness polling, sockets, resolver, TCP client/server
//! - [`time`]: Sleep and timeout

#[cfg(not(target_os = "linux"))]
compile_error!("corio only supports Linux (epoll)");

mod error;
mod reactor;
mod scheduler;

pub mod net;
pub mod time;

pub use error::{Error, Result};
pub use scheduler::task;
pub use scheduler::{Handle, Scheduler, SchedulerBuilder, ThreadStrategy};

pub use corio_macros::{main, test};
