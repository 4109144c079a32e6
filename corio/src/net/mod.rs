//! Networking on top of the scheduler.
//!
//! Everything here reports expected network conditions as values:
//! readiness waits yield a [`PollStatus`], connection establishment a
//! [`ConnectStatus`], name resolution a [`ResolveError`]. Operating system
//! error codes are translated once, at this layer.
//!
//! - [`poll`]: wait for read or write readiness with a deadline,
//! - [`Socket`]: an owned non-blocking stream socket,
//! - [`connect`]: non-blocking connection establishment,
//! - [`Resolver`]: asynchronous host name resolution,
//! - [`TcpClient`] / [`TcpServer`]: complete client and server sessions.

mod address;
mod connect;
mod poll;
mod resolver;
mod socket;
mod tcp;

pub use address::{Address, Domain, Hostname};
pub use connect::{ConnectStatus, connect};
pub use poll::{PollFuture, PollOp, PollStatus, poll};
pub use resolver::{DEFAULT_RESOLVE_TIMEOUT, ResolveError, Resolver};
pub use socket::Socket;
pub use tcp::client::{ClientOptions, ClientState, TcpClient};
pub use tcp::server::{ConnectionHandler, ServerOptions, TcpServer};
