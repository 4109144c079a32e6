use crate::error::{Error, Result};
use crate::net::address::Domain;
use crate::net::poll::{PollOp, PollStatus};
use crate::net::socket::Socket;
use crate::scheduler::task::{JoinHandle, Resumable};
use crate::scheduler::{Handle, Scheduler, SchedulerBuilder};
use crate::time::sleep;

use std::fmt;
use std::future::{Future, poll_fn};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::pin::{Pin, pin};
use std::sync::Arc;
use std::task::Poll;
use std::time::Duration;

/// Pause after an accept failure other than "nothing pending".
const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

/// Per-connection handler of a [`TcpServer`].
///
/// Invoked with the server's scheduler handle and the accepted socket; the
/// returned future is scheduled as its own task.
pub type ConnectionHandler =
    Arc<dyn Fn(Handle, Socket) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Configuration of a [`TcpServer`].
#[derive(Clone)]
pub struct ServerOptions {
    /// Address to bind. Defaults to `127.0.0.1`.
    pub address: IpAddr,

    /// Defaults to `8080`. Port `0` picks a free port.
    pub port: u16,

    /// Listen backlog. Defaults to `128`.
    pub backlog: u32,

    /// Required.
    pub on_connection: Option<ConnectionHandler>,

    /// Scheduler the server runs on.
    pub scheduler: SchedulerBuilder,
}

impl ServerOptions {
    /// Sets the per-connection handler from a closure.
    ///
    /// ```rust,ignore
    /// let options = ServerOptions::default().on_connection(|_, socket| async move {
    ///     let mut buf = [0; 1024];
    ///     socket.recv(&mut buf, Duration::ZERO).await;
    /// });
    /// ```
    pub fn on_connection<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Handle, Socket) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: ConnectionHandler = Arc::new(move |handle: Handle, socket: Socket| {
            Box::pin(handler(handle, socket)) as Pin<Box<dyn Future<Output = ()> + Send>>
        });

        self.on_connection = Some(handler);
        self
    }
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
            backlog: 128,
            on_connection: None,
            scheduler: SchedulerBuilder::new(),
        }
    }
}

impl fmt::Debug for ServerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerOptions")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("backlog", &self.backlog)
            .field("on_connection", &self.on_connection.is_some())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

/// A TCP server running its own scheduler.
///
/// A long-lived accept task waits for the listening socket to become
/// readable, accepts every pending connection and schedules the handler for
/// each one. That accept task is not counted by [`size`](Self::size), so
/// an idle server reports itself empty while it keeps accepting.
///
/// Dropping the server shuts it down.
pub struct TcpServer {
    scheduler: Scheduler,
    local_addr: SocketAddr,
}

impl TcpServer {
    /// Binds, listens, and starts accepting.
    ///
    /// # Errors
    ///
    /// [`Error::MissingHandler`] when no handler is configured, checked
    /// before any socket or thread is created; [`Error::Bind`] when the
    /// address cannot be bound or listened on; [`Error::Io`] otherwise.
    pub fn new(options: ServerOptions) -> Result<Self> {
        let Some(handler) = options.on_connection.clone() else {
            return Err(Error::MissingHandler);
        };

        let addr = SocketAddr::new(options.address, options.port);
        let listener =
            listen(addr, options.backlog).map_err(|source| Error::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        let scheduler = options.scheduler.build()?;
        let handle = scheduler.handle();

        if !handle.spawn_detached(accept_loop(handle.clone(), listener, handler)) {
            return Err(Error::Io(io::Error::other("scheduler refused the accept task")));
        }

        tracing::debug!(%local_addr, backlog = options.backlog, "server listening");

        Ok(Self {
            scheduler,
            local_addr,
        })
    }

    /// Address the listening socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn handle(&self) -> Handle {
        self.scheduler.handle()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Schedules extra work on the server's scheduler.
    pub fn schedule<R>(&self, task: R) -> bool
    where
        R: Resumable,
    {
        self.scheduler.schedule(task)
    }

    pub fn spawn<R>(&self, task: R) -> Option<JoinHandle<R::Output>>
    where
        R: Resumable,
    {
        self.scheduler.spawn(task)
    }

    /// Number of active connection handlers and other scheduled tasks.
    pub fn size(&self) -> usize {
        self.scheduler.size()
    }

    pub fn is_empty(&self) -> bool {
        self.scheduler.is_empty()
    }

    /// Stops accepting, lets running handlers finish, then stops the
    /// scheduler. Calling it again has no effect.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }
}

impl fmt::Debug for TcpServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpServer")
            .field("local_addr", &self.local_addr)
            .field("size", &self.size())
            .finish()
    }
}

fn listen(addr: SocketAddr, backlog: u32) -> io::Result<Socket> {
    let domain = Domain::of(&addr.ip());
    let socket = Socket::new(domain)?;

    socket.set_reuse_address()?;
    if domain == Domain::Ipv6 {
        socket.set_only_v6(false)?;
    }
    socket.bind(&addr)?;
    socket.listen(backlog)?;

    Ok(socket)
}

async fn accept_loop(handle: Handle, listener: Socket, handler: ConnectionHandler) {
    let mut shutdown = pin!(handle.shutdown_requested());

    loop {
        let mut readiness = pin!(listener.poll(PollOp::Read, Duration::ZERO));

        let status = poll_fn(|cx| {
            if shutdown.as_mut().poll(cx).is_ready() {
                return Poll::Ready(None);
            }
            readiness.as_mut().poll(cx).map(Some)
        })
        .await;

        match status {
            None => break,
            Some(PollStatus::Event | PollStatus::Timeout) => {}
            Some(status) => {
                tracing::warn!(%status, "listening socket failed");
                break;
            }
        }

        if let Err(err) = accept_pending(&handle, &listener, &handler) {
            tracing::warn!(error = %err, "accept failed");
            sleep(ACCEPT_BACKOFF).await;
        }
    }

    tracing::debug!("accept loop stopped");
}

/// Accepts every pending connection and schedules a handler for each.
fn accept_pending(handle: &Handle, listener: &Socket, handler: &ConnectionHandler) -> io::Result<()> {
    loop {
        match listener.accept() {
            Ok((socket, peer)) => {
                tracing::trace!(%peer, "connection accepted");

                if !handle.schedule(handler(handle.clone(), socket)) {
                    tracing::debug!(%peer, "server shutting down, connection dropped");
                }
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(()),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
}
