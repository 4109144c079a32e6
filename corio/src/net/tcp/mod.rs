//! TCP client and server sessions.
//!
//! - [`client`]: resolve, connect, then send and receive with a cached
//!   connection status,
//! - [`server`]: bind, listen, and dispatch each accepted connection to a
//!   handler task.

pub mod client;
pub mod server;
