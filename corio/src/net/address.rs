use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Protocol family of a socket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Domain {
    #[default]
    Ipv4,
    Ipv6,
}

impl Domain {
    /// Family of an IP address.
    pub fn of(ip: &IpAddr) -> Domain {
        match ip {
            IpAddr::V4(_) => Domain::Ipv4,
            IpAddr::V6(_) => Domain::Ipv6,
        }
    }

    /// The matching `AF_*` constant.
    pub(crate) fn as_raw(self) -> libc::c_int {
        match self {
            Domain::Ipv4 => libc::AF_INET,
            Domain::Ipv6 => libc::AF_INET6,
        }
    }

    /// Wildcard address of this family.
    pub fn unspecified(self) -> IpAddr {
        match self {
            Domain::Ipv4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            Domain::Ipv6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Domain::Ipv4 => "ipv4",
            Domain::Ipv6 => "ipv6",
        })
    }
}

/// A host name to be resolved before connecting.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Hostname(String);

impl Hostname {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Hostname {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Hostname {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Where a client connects to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Address {
    /// Resolved through a [`Resolver`](super::Resolver) at connect time.
    Hostname(Hostname),
    /// Used as is.
    Ip(IpAddr),
}

impl Default for Address {
    fn default() -> Self {
        Address::Ip(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        Address::Ip(ip)
    }
}

impl From<Ipv4Addr> for Address {
    fn from(ip: Ipv4Addr) -> Self {
        Address::Ip(IpAddr::V4(ip))
    }
}

impl From<Ipv6Addr> for Address {
    fn from(ip: Ipv6Addr) -> Self {
        Address::Ip(IpAddr::V6(ip))
    }
}

impl From<Hostname> for Address {
    fn from(name: Hostname) -> Self {
        Address::Hostname(name)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Hostname(name) => name.fmt(f),
            Address::Ip(ip) => ip.fmt(f),
        }
    }
}
