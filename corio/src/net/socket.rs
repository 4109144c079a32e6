use super::address::Domain;
use super::poll::{PollFuture, PollOp, PollStatus, poll};
use crate::reactor::poller::platform::{
    sys_accept, sys_bind, sys_close, sys_listen, sys_peername, sys_read, sys_send,
    sys_set_reuseaddr, sys_set_v6only, sys_shutdown, sys_socket, sys_sockname,
};

use std::fmt;
use std::io;
use std::net::{Shutdown, SocketAddr};
use std::os::fd::{AsRawFd, IntoRawFd, RawFd};
use std::time::Duration;

/// An owned, non-blocking stream socket.
///
/// The descriptor is closed exactly once, when the `Socket` is dropped.
/// A `Socket` can be moved but never copied.
pub struct Socket {
    fd: RawFd,
    domain: Domain,
}

impl Socket {
    /// Creates a non-blocking, close-on-exec TCP socket.
    pub fn new(domain: Domain) -> io::Result<Socket> {
        sys_socket(domain.as_raw()).map(|fd| Socket { fd, domain })
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn bind(&self, addr: &SocketAddr) -> io::Result<()> {
        sys_bind(self.fd, addr)
    }

    pub fn listen(&self, backlog: u32) -> io::Result<()> {
        let backlog = backlog.min(libc::c_int::MAX as u32) as libc::c_int;
        sys_listen(self.fd, backlog)
    }

    /// Accepts one pending connection without suspending.
    ///
    /// Returns `WouldBlock` when none is pending.
    pub fn accept(&self) -> io::Result<(Socket, SocketAddr)> {
        let (fd, peer) = sys_accept(self.fd)?;
        let socket = Socket {
            fd,
            domain: self.domain,
        };
        Ok((socket, peer))
    }

    pub fn set_reuse_address(&self) -> io::Result<()> {
        sys_set_reuseaddr(self.fd)
    }

    /// Restricts an IPv6 socket to IPv6 traffic, or lets it accept IPv4
    /// mapped connections too (`false`).
    pub fn set_only_v6(&self, only_v6: bool) -> io::Result<()> {
        sys_set_v6only(self.fd, only_v6)
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        sys_sockname(self.fd)
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        sys_peername(self.fd)
    }

    pub fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        sys_shutdown(self.fd, how)
    }

    /// Waits for readiness in direction `op`. A zero `timeout` waits
    /// indefinitely.
    pub fn poll(&self, op: PollOp, timeout: Duration) -> PollFuture<'_> {
        poll(self, op, timeout)
    }

    /// Waits for read readiness, then reads once into `buffer`.
    ///
    /// Returns the poll outcome and the number of bytes read. A partial read
    /// is normal. The byte count is only meaningful with
    /// [`PollStatus::Event`]; an orderly shutdown by the peer is reported as
    /// `(Closed, 0)`.
    pub async fn recv(&self, buffer: &mut [u8], timeout: Duration) -> (PollStatus, usize) {
        let status = self.poll(PollOp::Read, timeout).await;
        if status != PollStatus::Event {
            return (status, 0);
        }

        match sys_read(self.fd, buffer) {
            Ok(0) if !buffer.is_empty() => (PollStatus::Closed, 0),
            Ok(n) => (PollStatus::Event, n),
            Err(err) => (transfer_error(self.fd, &err), 0),
        }
    }

    /// Waits for write readiness, then writes once from `buffer`.
    ///
    /// Returns the poll outcome and the number of bytes written, which may
    /// be less than `buffer.len()`. Never raises `SIGPIPE`.
    pub async fn send(&self, buffer: &[u8], timeout: Duration) -> (PollStatus, usize) {
        let status = self.poll(PollOp::Write, timeout).await;
        if status != PollStatus::Event {
            return (status, 0);
        }

        match sys_send(self.fd, buffer) {
            Ok(n) => (PollStatus::Event, n),
            Err(err) => (transfer_error(self.fd, &err), 0),
        }
    }
}

/// Maps a failed transfer after a readiness event to an outcome.
fn transfer_error(fd: RawFd, err: &io::Error) -> PollStatus {
    match err.kind() {
        // Spurious readiness; nothing transferred.
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => PollStatus::Event,
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::NotConnected => PollStatus::Closed,
        _ => {
            tracing::debug!(fd, error = %err, "socket transfer failed");
            PollStatus::Error
        }
    }
}

impl AsRawFd for Socket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl IntoRawFd for Socket {
    fn into_raw_fd(self) -> RawFd {
        let fd = self.fd;
        std::mem::forget(self);
        fd
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        sys_close(self.fd);
    }
}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("fd", &self.fd)
            .field("domain", &self.domain)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn transfer_errors_map_to_outcomes() {
        let reset = io::Error::from(io::ErrorKind::ConnectionReset);
        let pipe = io::Error::from_raw_os_error(libc::EPIPE);
        let would_block = io::Error::from(io::ErrorKind::WouldBlock);
        let other = io::Error::from_raw_os_error(libc::EBADF);

        assert_eq!(transfer_error(-1, &reset), PollStatus::Closed);
        assert_eq!(transfer_error(-1, &pipe), PollStatus::Closed);
        assert_eq!(transfer_error(-1, &would_block), PollStatus::Event);
        assert_eq!(transfer_error(-1, &other), PollStatus::Error);
    }

    #[test]
    fn bound_socket_reports_its_address() {
        let socket = Socket::new(Domain::Ipv4).unwrap();
        socket.set_reuse_address().unwrap();
        socket
            .bind(&SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
            .unwrap();
        socket.listen(16).unwrap();

        let addr = socket.local_addr().unwrap();
        assert_eq!(addr.ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_ne!(addr.port(), 0);

        let err = socket.accept().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
    }
}
