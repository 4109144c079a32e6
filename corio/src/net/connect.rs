use super::address::Domain;
use super::poll::{PollOp, PollStatus, poll};
use super::socket::Socket;
use crate::reactor::poller::platform::{sys_connect, sys_peername, sys_take_socket_error};

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::os::fd::AsRawFd;
use std::time::Duration;

/// Outcome of connection establishment.
///
/// Every variant other than `Connected` is an ordinary result that callers
/// branch on, not a programming error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectStatus {
    Connected,
    /// The target address cannot be connected to from this socket.
    InvalidIpAddress,
    InvalidPort,
    /// The deadline passed before the handshake completed.
    Timeout,
    /// Nothing listens on the target port.
    Refused,
    /// No route to the target network or host.
    Unreachable,
    /// The hostname could not be resolved.
    ResolveFailed,
    /// Any other failure.
    Error,
}

impl ConnectStatus {
    pub fn is_connected(self) -> bool {
        self == ConnectStatus::Connected
    }
}

impl fmt::Display for ConnectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectStatus::Connected => "connected",
            ConnectStatus::InvalidIpAddress => "invalid ip address",
            ConnectStatus::InvalidPort => "invalid port",
            ConnectStatus::Timeout => "timeout",
            ConnectStatus::Refused => "connection refused",
            ConnectStatus::Unreachable => "unreachable",
            ConnectStatus::ResolveFailed => "resolve failed",
            ConnectStatus::Error => "error",
        })
    }
}

/// Connects `socket` to `target`, suspending until the handshake
/// completes, fails, or `timeout` elapses (zero waits indefinitely).
///
/// The target is validated before any system call: port 0, wildcard and
/// multicast addresses, and an address family different from the
/// socket's are rejected.
///
/// Calling this again on a socket whose handshake with `target` is still
/// in flight waits for that handshake instead of starting a new one.
pub async fn connect(socket: &Socket, target: SocketAddr, timeout: Duration) -> ConnectStatus {
    if let Some(status) = validate(socket.domain(), &target) {
        return status;
    }

    let fd = socket.as_raw_fd();

    match sys_connect(fd, &target) {
        Ok(()) => return ConnectStatus::Connected,
        Err(err) => match err.raw_os_error() {
            Some(libc::EINPROGRESS | libc::EALREADY) => {}
            Some(libc::EISCONN) => {
                return match sys_peername(fd) {
                    Ok(peer) if peer == target => ConnectStatus::Connected,
                    _ => ConnectStatus::Error,
                };
            }
            _ => return classify(&err),
        },
    }

    match poll(socket, PollOp::Write, timeout).await {
        PollStatus::Timeout => ConnectStatus::Timeout,
        PollStatus::Event => match sys_take_socket_error(fd) {
            Ok(()) if sys_peername(fd).is_ok() => ConnectStatus::Connected,
            Ok(()) => ConnectStatus::Error,
            Err(err) => classify(&err),
        },
        // Readiness was never observed, so a clear socket error does not
        // mean the handshake finished.
        PollStatus::Error | PollStatus::Closed => match sys_take_socket_error(fd) {
            Ok(()) => ConnectStatus::Error,
            Err(err) => classify(&err),
        },
    }
}

fn validate(domain: Domain, target: &SocketAddr) -> Option<ConnectStatus> {
    if target.port() == 0 {
        return Some(ConnectStatus::InvalidPort);
    }

    let ip = target.ip();
    if ip.is_unspecified() || ip.is_multicast() || Domain::of(&ip) != domain {
        return Some(ConnectStatus::InvalidIpAddress);
    }

    None
}

/// Maps an establishment failure to a status.
fn classify(err: &io::Error) -> ConnectStatus {
    match err.raw_os_error() {
        Some(libc::ECONNREFUSED) => ConnectStatus::Refused,
        Some(libc::ETIMEDOUT) => ConnectStatus::Timeout,
        Some(libc::ENETUNREACH | libc::EHOSTUNREACH) => ConnectStatus::Unreachable,
        Some(libc::EAFNOSUPPORT | libc::EADDRNOTAVAIL | libc::EINVAL) => {
            ConnectStatus::InvalidIpAddress
        }
        _ => ConnectStatus::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    #[test]
    fn classifies_os_errors() {
        let status = |code| classify(&io::Error::from_raw_os_error(code));

        assert_eq!(status(libc::ECONNREFUSED), ConnectStatus::Refused);
        assert_eq!(status(libc::ETIMEDOUT), ConnectStatus::Timeout);
        assert_eq!(status(libc::EHOSTUNREACH), ConnectStatus::Unreachable);
        assert_eq!(status(libc::EADDRNOTAVAIL), ConnectStatus::InvalidIpAddress);
        assert_eq!(status(libc::EACCES), ConnectStatus::Error);
    }

    #[test]
    fn rejects_bad_targets_up_front() {
        let v4 = |ip: Ipv4Addr, port| SocketAddr::new(IpAddr::V4(ip), port);

        assert_eq!(
            validate(Domain::Ipv4, &v4(Ipv4Addr::LOCALHOST, 0)),
            Some(ConnectStatus::InvalidPort)
        );
        assert_eq!(
            validate(Domain::Ipv4, &v4(Ipv4Addr::UNSPECIFIED, 80)),
            Some(ConnectStatus::InvalidIpAddress)
        );
        assert_eq!(
            validate(Domain::Ipv4, &v4(Ipv4Addr::new(224, 0, 0, 1), 80)),
            Some(ConnectStatus::InvalidIpAddress)
        );
        assert_eq!(
            validate(
                Domain::Ipv4,
                &SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 80)
            ),
            Some(ConnectStatus::InvalidIpAddress)
        );
        assert_eq!(validate(Domain::Ipv4, &v4(Ipv4Addr::LOCALHOST, 80)), None);
    }
}
