use libc::{
    AF_INET, AF_INET6, EFD_CLOEXEC, EFD_NONBLOCK, F_GETFL, F_SETFL, IPPROTO_IPV6, IPV6_V6ONLY,
    MSG_NOSIGNAL, O_NONBLOCK, SHUT_RD, SHUT_RDWR, SHUT_WR, SO_ERROR, SO_REUSEADDR, SOCK_CLOEXEC,
    SOCK_NONBLOCK, SOCK_STREAM, SOL_SOCKET, accept4, addrinfo, bind, c_int, close, connect,
    eventfd, fcntl, freeaddrinfo, getaddrinfo, getpeername, getsockname, getsockopt, listen, read,
    send, setsockopt, shutdown, sockaddr, sockaddr_in, sockaddr_in6, sockaddr_storage, socket,
    socklen_t, write,
};
use std::ffi::{CStr, CString};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::{io, mem, ptr};

pub(crate) use std::os::fd::RawFd;

/// Converts a `-1`-style return code into an `io::Result`.
fn cvt(rc: c_int) -> io::Result<c_int> {
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc)
    }
}

/// Converts a `-1`-style byte count into an `io::Result`.
fn cvt_size(n: isize) -> io::Result<usize> {
    if n < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(n as usize)
    }
}

/// Reads from a non-blocking descriptor into `buffer`.
pub(crate) fn sys_read(fd: RawFd, buffer: &mut [u8]) -> io::Result<usize> {
    cvt_size(unsafe { read(fd, buffer.as_mut_ptr() as *mut _, buffer.len()) })
}

/// Sends `buffer` on a non-blocking socket.
///
/// Uses `MSG_NOSIGNAL` so a peer that went away shows up as `EPIPE`
/// instead of killing the process with `SIGPIPE`.
pub(crate) fn sys_send(fd: RawFd, buffer: &[u8]) -> io::Result<usize> {
    cvt_size(unsafe { send(fd, buffer.as_ptr() as *const _, buffer.len(), MSG_NOSIGNAL) })
}

/// Closes a file descriptor.
pub(crate) fn sys_close(fd: RawFd) {
    unsafe { close(fd) };
}

/// Sets a file descriptor to non-blocking mode.
pub(crate) fn sys_set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = cvt(unsafe { fcntl(fd, F_GETFL) })?;
    cvt(unsafe { fcntl(fd, F_SETFL, flags | O_NONBLOCK) })?;

    Ok(())
}

/// Creates a non-blocking, close-on-exec stream socket.
pub(crate) fn sys_socket(domain: c_int) -> io::Result<RawFd> {
    let fd = cvt(unsafe { socket(domain, SOCK_STREAM | SOCK_CLOEXEC, 0) })?;

    if let Err(e) = sys_set_nonblocking(fd) {
        sys_close(fd);
        return Err(e);
    }

    Ok(fd)
}

/// Creates a non-blocking, close-on-exec `eventfd`.
pub(crate) fn sys_eventfd() -> io::Result<RawFd> {
    cvt(unsafe { eventfd(0, EFD_NONBLOCK | EFD_CLOEXEC) })
}

/// Adds one to an `eventfd` counter, making it readable.
pub(crate) fn sys_eventfd_signal(fd: RawFd) {
    let value: u64 = 1;
    unsafe {
        write(fd, &value as *const u64 as *const _, mem::size_of::<u64>());
    }
}

/// Resets an `eventfd` counter to zero.
pub(crate) fn sys_eventfd_drain(fd: RawFd) {
    let mut value: u64 = 0;
    unsafe {
        read(fd, &mut value as *mut u64 as *mut _, mem::size_of::<u64>());
    }
}

/// Binds a socket to an address.
pub(crate) fn sys_bind(fd: RawFd, addr: &SocketAddr) -> io::Result<()> {
    let (storage, len) = socketaddr_to_storage(addr);
    cvt(unsafe { bind(fd, &storage as *const _ as *const sockaddr, len) })?;

    Ok(())
}

/// Marks a socket as a listening socket.
pub(crate) fn sys_listen(fd: RawFd, backlog: c_int) -> io::Result<()> {
    cvt(unsafe { listen(fd, backlog) })?;

    Ok(())
}

/// Accepts a pending connection without blocking.
///
/// The accepted socket is created non-blocking and close-on-exec.
pub(crate) fn sys_accept(fd: RawFd) -> io::Result<(RawFd, SocketAddr)> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<sockaddr_storage>() as socklen_t;

    let client_fd = cvt(unsafe {
        accept4(
            fd,
            &mut storage as *mut _ as *mut sockaddr,
            &mut len,
            SOCK_NONBLOCK | SOCK_CLOEXEC,
        )
    })?;

    match sockaddr_storage_to_socketaddr(&storage) {
        Ok(addr) => Ok((client_fd, addr)),
        Err(e) => {
            sys_close(client_fd);
            Err(e)
        }
    }
}

/// Returns the local address of a socket.
pub(crate) fn sys_sockname(fd: RawFd) -> io::Result<SocketAddr> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<sockaddr_storage>() as socklen_t;

    cvt(unsafe { getsockname(fd, &mut storage as *mut _ as *mut sockaddr, &mut len) })?;
    sockaddr_storage_to_socketaddr(&storage)
}

/// Returns the remote address of a connected socket.
pub(crate) fn sys_peername(fd: RawFd) -> io::Result<SocketAddr> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<sockaddr_storage>() as socklen_t;

    cvt(unsafe { getpeername(fd, &mut storage as *mut _ as *mut sockaddr, &mut len) })?;
    sockaddr_storage_to_socketaddr(&storage)
}

/// Initiates a non-blocking connection.
///
/// `EINPROGRESS` is returned as an error; the caller decides whether to
/// wait for write readiness.
pub(crate) fn sys_connect(fd: RawFd, addr: &SocketAddr) -> io::Result<()> {
    let (storage, len) = socketaddr_to_storage(addr);
    cvt(unsafe { connect(fd, &storage as *const _ as *const sockaddr, len) })?;

    Ok(())
}

/// Takes the pending error of a socket (`SO_ERROR`).
///
/// Returns `Ok(())` when no error is pending, which after a write-ready
/// event means a non-blocking connect has completed.
pub(crate) fn sys_take_socket_error(fd: RawFd) -> io::Result<()> {
    let mut value: c_int = 0;
    let mut len = mem::size_of::<c_int>() as socklen_t;

    cvt(unsafe {
        getsockopt(
            fd,
            SOL_SOCKET,
            SO_ERROR,
            &mut value as *mut _ as *mut _,
            &mut len,
        )
    })?;

    if value == 0 {
        Ok(())
    } else {
        Err(io::Error::from_raw_os_error(value))
    }
}

/// Shuts down a socket.
pub(crate) fn sys_shutdown(fd: RawFd, how: Shutdown) -> io::Result<()> {
    let how = match how {
        Shutdown::Read => SHUT_RD,
        Shutdown::Write => SHUT_WR,
        Shutdown::Both => SHUT_RDWR,
    };

    cvt(unsafe { shutdown(fd, how) })?;

    Ok(())
}

/// Sets an integer socket option.
fn sys_setsockopt_int(fd: RawFd, level: c_int, name: c_int, value: c_int) -> io::Result<()> {
    cvt(unsafe {
        setsockopt(
            fd,
            level,
            name,
            &value as *const _ as *const _,
            mem::size_of::<c_int>() as socklen_t,
        )
    })?;

    Ok(())
}

/// Enables `SO_REUSEADDR` on a socket.
pub(crate) fn sys_set_reuseaddr(fd: RawFd) -> io::Result<()> {
    sys_setsockopt_int(fd, SOL_SOCKET, SO_REUSEADDR, 1)
}

/// Sets the `IPV6_V6ONLY` socket option.
pub(crate) fn sys_set_v6only(fd: RawFd, v6only: bool) -> io::Result<()> {
    sys_setsockopt_int(fd, IPPROTO_IPV6, IPV6_V6ONLY, v6only as c_int)
}

/// Resolves `host` to the addresses of the given family with `getaddrinfo(3)`.
///
/// This call blocks. An unknown host is reported with
/// [`io::ErrorKind::NotFound`].
pub(crate) fn sys_getaddrinfo(host: &str, family: c_int) -> io::Result<Vec<IpAddr>> {
    let host = CString::new(host)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "hostname contains a nul byte"))?;

    let mut hints: addrinfo = unsafe { mem::zeroed() };
    hints.ai_family = family;
    hints.ai_socktype = SOCK_STREAM;

    let mut list: *mut addrinfo = ptr::null_mut();
    let rc = unsafe { getaddrinfo(host.as_ptr(), ptr::null(), &hints, &mut list) };

    if rc != 0 {
        return Err(gai_error(rc));
    }

    let mut addresses = Vec::new();
    let mut cursor = list;

    while !cursor.is_null() {
        let info = unsafe { &*cursor };

        if !info.ai_addr.is_null() && info.ai_addrlen as usize <= mem::size_of::<sockaddr_storage>() {
            let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
            unsafe {
                ptr::copy_nonoverlapping(
                    info.ai_addr as *const u8,
                    &mut storage as *mut _ as *mut u8,
                    info.ai_addrlen as usize,
                );
            }

            if let Ok(addr) = sockaddr_storage_to_socketaddr(&storage) {
                if !addresses.contains(&addr.ip()) {
                    addresses.push(addr.ip());
                }
            }
        }

        cursor = info.ai_next;
    }

    unsafe { freeaddrinfo(list) };

    if addresses.is_empty() {
        return Err(io::Error::new(io::ErrorKind::NotFound, "no addresses found"));
    }

    Ok(addresses)
}

/// Translates a `getaddrinfo` return code into an `io::Error`.
fn gai_error(rc: c_int) -> io::Error {
    if rc == libc::EAI_SYSTEM {
        return io::Error::last_os_error();
    }

    let message = unsafe { CStr::from_ptr(libc::gai_strerror(rc)) }
        .to_string_lossy()
        .into_owned();

    if rc == libc::EAI_NONAME {
        io::Error::new(io::ErrorKind::NotFound, message)
    } else {
        io::Error::other(message)
    }
}

/// Converts a `sockaddr_storage` to a Rust `SocketAddr`.
pub(crate) fn sockaddr_storage_to_socketaddr(storage: &sockaddr_storage) -> io::Result<SocketAddr> {
    match storage.ss_family as c_int {
        AF_INET => {
            let addr = unsafe { &*(storage as *const _ as *const sockaddr_in) };
            let ip = Ipv4Addr::from(u32::from_be(addr.sin_addr.s_addr));
            let port = u16::from_be(addr.sin_port);

            Ok(SocketAddr::V4(SocketAddrV4::new(ip, port)))
        }

        AF_INET6 => {
            let addr = unsafe { &*(storage as *const _ as *const sockaddr_in6) };
            let ip = Ipv6Addr::from(addr.sin6_addr.s6_addr);
            let port = u16::from_be(addr.sin6_port);

            Ok(SocketAddr::V6(SocketAddrV6::new(
                ip,
                port,
                addr.sin6_flowinfo,
                addr.sin6_scope_id,
            )))
        }

        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "unsupported address family",
        )),
    }
}

/// Converts a `SocketAddr` to a `sockaddr_storage`.
pub(crate) fn socketaddr_to_storage(addr: &SocketAddr) -> (sockaddr_storage, socklen_t) {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };

    match addr {
        SocketAddr::V4(v4) => {
            let sa = unsafe { &mut *(&mut storage as *mut _ as *mut sockaddr_in) };
            sa.sin_family = AF_INET as _;
            sa.sin_port = v4.port().to_be();
            sa.sin_addr.s_addr = u32::from(*v4.ip()).to_be();

            (storage, mem::size_of::<sockaddr_in>() as socklen_t)
        }

        SocketAddr::V6(v6) => {
            let sa = unsafe { &mut *(&mut storage as *mut _ as *mut sockaddr_in6) };
            sa.sin6_family = AF_INET6 as _;
            sa.sin6_port = v6.port().to_be();
            sa.sin6_addr.s6_addr = v6.ip().octets();
            sa.sin6_flowinfo = v6.flowinfo();
            sa.sin6_scope_id = v6.scope_id();

            (storage, mem::size_of::<sockaddr_in6>() as socklen_t)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sockaddr_conversion_preserves_v4_and_v6() {
        let v4: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let v6: SocketAddr = "[::1]:9000".parse().unwrap();

        for addr in [v4, v6] {
            let (storage, _) = socketaddr_to_storage(&addr);
            assert_eq!(sockaddr_storage_to_socketaddr(&storage).unwrap(), addr);
        }
    }

    #[test]
    fn getaddrinfo_resolves_localhost() {
        let addrs = sys_getaddrinfo("localhost", AF_INET).unwrap();
        assert!(addrs.contains(&IpAddr::V4(Ipv4Addr::LOCALHOST)));
    }

    #[test]
    fn socket_error_is_clear_on_fresh_socket() {
        let fd = sys_socket(AF_INET).unwrap();
        assert!(sys_take_socket_error(fd).is_ok());
        sys_close(fd);
    }
}
