use crate::error::{Error, Result};
use crate::net::address::{Address, Domain};
use crate::net::connect::{ConnectStatus, connect};
use crate::net::poll::PollStatus;
use crate::net::resolver::{ResolveError, Resolver};
use crate::net::socket::Socket;

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Configuration of a [`TcpClient`].
#[derive(Clone, Debug)]
pub struct ClientOptions {
    /// Peer to connect to. Defaults to `127.0.0.1`.
    pub address: Address,

    /// Defaults to `8080`.
    pub port: u16,

    /// Family of the client socket. Defaults to IPv4.
    pub domain: Domain,

    /// Required when `address` is a hostname.
    pub resolver: Option<Resolver>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            address: Address::default(),
            port: 8080,
            domain: Domain::Ipv4,
            resolver: None,
        }
    }
}

/// Connection state of a [`TcpClient`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientState {
    Unconnected,
    /// An attempt is in flight, or was dropped before finishing. The next
    /// [`TcpClient::connect`] picks up the same handshake.
    Connecting,
    Connected,
    /// A connect attempt ended with this status. Terminal.
    Failed(ConnectStatus),
}

/// A TCP client session: resolve, connect, then send and receive.
///
/// The outcome of the first completed [`connect`](Self::connect) is cached
/// for the lifetime of the client; later calls return it without touching
/// the network. Build a new client to try again.
///
/// # Examples
///
/// ```rust,ignore
/// let mut client = TcpClient::new(ClientOptions::default())?;
///
/// if client.connect(Duration::from_secs(1)).await.is_connected() {
///     let (status, sent) = client.send(b"ping", Duration::from_secs(1)).await;
/// }
/// ```
#[derive(Debug)]
pub struct TcpClient {
    options: ClientOptions,
    socket: Socket,
    state: ClientState,
    resolved: Option<IpAddr>,
}

impl TcpClient {
    /// Creates the client and its socket.
    ///
    /// # Errors
    ///
    /// [`Error::MissingResolver`] when a hostname is configured without a
    /// resolver; [`Error::Io`] when the socket cannot be created.
    pub fn new(options: ClientOptions) -> Result<Self> {
        if let Address::Hostname(hostname) = &options.address {
            if options.resolver.is_none() {
                return Err(Error::MissingResolver {
                    hostname: hostname.clone(),
                });
            }
        }

        let socket = Socket::new(options.domain)?;

        Ok(Self {
            options,
            socket,
            state: ClientState::Unconnected,
            resolved: None,
        })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    /// The cached connect outcome, if a connect attempt has completed.
    pub fn status(&self) -> Option<ConnectStatus> {
        match self.state {
            ClientState::Connected => Some(ConnectStatus::Connected),
            ClientState::Failed(status) => Some(status),
            ClientState::Unconnected | ClientState::Connecting => None,
        }
    }

    pub fn socket(&self) -> &Socket {
        &self.socket
    }

    /// Connects to the configured peer, resolving it first if needed.
    ///
    /// `timeout` bounds the handshake; zero waits indefinitely. Resolution
    /// is bounded by the resolver's own timeout.
    pub async fn connect(&mut self, timeout: Duration) -> ConnectStatus {
        if let Some(status) = self.status() {
            return status;
        }

        self.state = ClientState::Connecting;

        let status = match self.target().await {
            Ok(ip) => {
                connect(&self.socket, SocketAddr::new(ip, self.options.port), timeout).await
            }
            Err(status) => status,
        };

        self.state = match status {
            ConnectStatus::Connected => ClientState::Connected,
            failed => ClientState::Failed(failed),
        };

        tracing::debug!(
            address = %self.options.address,
            port = self.options.port,
            %status,
            "connect finished"
        );

        status
    }

    /// Picks the address to connect to. Only the first resolved address is
    /// used, and it is kept for later attempts.
    async fn target(&mut self) -> std::result::Result<IpAddr, ConnectStatus> {
        if let Some(ip) = self.resolved {
            return Ok(ip);
        }

        let hostname = match &self.options.address {
            Address::Ip(ip) => return Ok(*ip),
            Address::Hostname(hostname) => hostname,
        };

        let Some(resolver) = &self.options.resolver else {
            return Err(ConnectStatus::ResolveFailed);
        };

        match resolver.resolve(hostname, self.options.domain).await {
            Ok(addresses) => {
                let ip = addresses
                    .first()
                    .copied()
                    .ok_or(ConnectStatus::ResolveFailed)?;
                self.resolved = Some(ip);
                Ok(ip)
            }
            Err(ResolveError::Timeout { .. }) => Err(ConnectStatus::Timeout),
            Err(err) => {
                tracing::debug!(%hostname, error = %err, "resolution failed");
                Err(ConnectStatus::ResolveFailed)
            }
        }
    }

    /// Sends once from `buffer` after waiting for write readiness.
    ///
    /// Returns `(Error, 0)` unless connected. The byte count may be less
    /// than `buffer.len()`.
    pub async fn send(&self, buffer: &[u8], timeout: Duration) -> (PollStatus, usize) {
        if self.state != ClientState::Connected {
            return (PollStatus::Error, 0);
        }

        self.socket.send(buffer, timeout).await
    }

    /// Receives once into `buffer` after waiting for read readiness.
    ///
    /// Returns `(Error, 0)` unless connected.
    pub async fn recv(&self, buffer: &mut [u8], timeout: Duration) -> (PollStatus, usize) {
        if self.state != ClientState::Connected {
            return (PollStatus::Error, 0);
        }

        self.socket.recv(buffer, timeout).await
    }
}
