use super::address::{Domain, Hostname};
use super::poll::{PollOp, PollStatus, poll};
use crate::reactor::poller::Waker;
use crate::reactor::poller::platform::sys_getaddrinfo;

use parking_lot::Mutex;
use std::io;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Default bound on a single resolution.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Reasons a resolution produced no address.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("no {domain} address found for `{hostname}`")]
    NotFound { hostname: Hostname, domain: Domain },

    #[error("resolving `{hostname}` timed out after {timeout:?}")]
    Timeout { hostname: Hostname, timeout: Duration },

    #[error("resolver transport failed")]
    Transport(#[source] io::Error),
}

/// Asynchronous host name resolver.
///
/// Each lookup runs the system resolver off the scheduler and suspends the
/// calling task on a completion descriptor, bounded by the resolver's
/// timeout. Results are not cached.
///
/// Clones share the same configuration and lookup counter.
#[derive(Clone, Debug)]
pub struct Resolver {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    timeout: Duration,
    lookups: AtomicUsize,
}

type Outcome = Arc<Mutex<Option<io::Result<Vec<IpAddr>>>>>;

impl Resolver {
    /// Creates a resolver whose lookups give up after `timeout`.
    ///
    /// A zero `timeout` never gives up.
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                timeout,
                lookups: AtomicUsize::new(0),
            }),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Number of lookups started so far.
    pub fn lookups(&self) -> usize {
        self.inner.lookups.load(Ordering::SeqCst)
    }

    /// Resolves `hostname` to the addresses of family `domain`.
    ///
    /// # Panics
    ///
    /// Panics if awaited outside of a scheduler.
    pub async fn resolve(
        &self,
        hostname: &Hostname,
        domain: Domain,
    ) -> Result<Vec<IpAddr>, ResolveError> {
        self.inner.lookups.fetch_add(1, Ordering::SeqCst);

        let done = Arc::new(Waker::new().map_err(ResolveError::Transport)?);
        let outcome: Outcome = Arc::new(Mutex::new(None));

        {
            let done = done.clone();
            let outcome = outcome.clone();
            let host = hostname.as_str().to_owned();

            thread::Builder::new()
                .name("corio-resolver".into())
                .spawn(move || {
                    let result = sys_getaddrinfo(&host, domain.as_raw());
                    *outcome.lock() = Some(result);
                    done.wake();
                })
                .map_err(ResolveError::Transport)?;
        }

        let status = poll(&*done, PollOp::Read, self.inner.timeout).await;
        tracing::trace!(%hostname, %status, "resolution finished");

        match status {
            PollStatus::Event => {}
            PollStatus::Timeout => {
                return Err(ResolveError::Timeout {
                    hostname: hostname.clone(),
                    timeout: self.inner.timeout,
                });
            }
            PollStatus::Error | PollStatus::Closed => {
                return Err(ResolveError::Transport(io::Error::other(
                    "resolver completion signal failed",
                )));
            }
        }

        match outcome.lock().take() {
            Some(Ok(addresses)) => Ok(addresses),
            Some(Err(err)) if err.kind() == io::ErrorKind::NotFound => {
                Err(ResolveError::NotFound {
                    hostname: hostname.clone(),
                    domain,
                })
            }
            Some(Err(err)) => Err(ResolveError::Transport(err)),
            None => Err(ResolveError::Transport(io::Error::other(
                "resolver signalled without a result",
            ))),
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLVE_TIMEOUT)
    }
}
