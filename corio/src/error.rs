use crate::net::Hostname;

use std::io;
use std::net::SocketAddr;

/// Configuration and setup failures.
///
/// Expected network conditions are not errors: they are reported as
/// [`PollStatus`](crate::net::PollStatus) and
/// [`ConnectStatus`](crate::net::ConnectStatus) values.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A server was configured without a per-connection handler.
    #[error("server options have no connection handler")]
    MissingHandler,

    /// A client was configured with a hostname but no resolver.
    #[error("hostname `{hostname}` configured without a resolver")]
    MissingResolver { hostname: Hostname },

    #[error("failed to listen on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
