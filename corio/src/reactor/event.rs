use std::os::fd::RawFd;

/// Readiness reported by the poller for one descriptor.
///
/// A single event may carry several flags at once; the reactor decides
/// per registered direction which of them is relevant.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Event {
    /// Descriptor the event belongs to.
    pub(crate) fd: RawFd,

    /// Data can be read (or the peer's end of stream is readable).
    pub(crate) readable: bool,

    /// Data can be written.
    pub(crate) writable: bool,

    /// The descriptor reports a pending error.
    pub(crate) error: bool,

    /// Both directions are shut down.
    pub(crate) closed: bool,

    /// The peer shut down its writing half. Writes may still succeed.
    pub(crate) read_closed: bool,
}
