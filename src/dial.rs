//! Connection dialing.
//!
//! A dialer opens a byte stream to a `host:port` address. The transport asks
//! its dialer for every new pooled connection; the proxy composer produces
//! dialers that tunnel through one or more proxies before handing the stream
//! back.

use std::fmt;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// A bidirectional byte stream a dialer can return.
pub trait Conn: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Conn for T {}

/// A boxed, type-erased connection.
pub type BoxConn = Box<dyn Conn>;

/// Opens connections to `host:port` addresses.
#[async_trait]
pub trait Dial: Send + Sync + fmt::Debug {
    /// Connects to `addr`, written as `host:port` (`[v6]:port` for IPv6 literals).
    async fn dial(&self, addr: &str) -> io::Result<BoxConn>;
}

/// Shared dial function stored in `ClientConfig`.
pub type DialFn = Arc<dyn Dial>;

/// Plain TCP dialer with `TCP_NODELAY` set.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

#[async_trait]
impl Dial for TcpDialer {
    async fn dial(&self, addr: &str) -> io::Result<BoxConn> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }
}

/// Returns the default direct TCP dialer.
pub fn tcp() -> DialFn {
    Arc::new(TcpDialer)
}

/// Adapts a closure into a [`Dial`] implementation.
pub struct FnDialer<F> {
    f: F,
}

impl<F> fmt::Debug for FnDialer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnDialer").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Dial for FnDialer<F>
where
    F: Fn(String) -> BoxFuture<'static, io::Result<BoxConn>> + Send + Sync,
{
    async fn dial(&self, addr: &str) -> io::Result<BoxConn> {
        (self.f)(addr.to_string()).await
    }
}

/// Builds a dial function from a closure.
///
/// ```no_run
/// use futures::FutureExt;
/// use httpx::dial::{dial_fn, BoxConn};
///
/// let dial = dial_fn(|addr: String| {
///     async move {
///         let stream = tokio::net::TcpStream::connect(addr).await?;
///         Ok(Box::new(stream) as BoxConn)
///     }
///     .boxed()
/// });
/// ```
pub fn dial_fn<F>(f: F) -> DialFn
where
    F: Fn(String) -> BoxFuture<'static, io::Result<BoxConn>> + Send + Sync + 'static,
{
    Arc::new(FnDialer { f })
}

/// Splits `host:port` into its parts, unwrapping bracketed IPv6 literals.
pub(crate) fn split_host_port(addr: &str) -> io::Result<(String, u16)> {
    let invalid = || {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid address {addr:?}"),
        )
    };
    let (host, port) = addr.rsplit_once(':').ok_or_else(invalid)?;
    let port = port.parse::<u16>().map_err(|_| invalid())?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if host.is_empty() {
        return Err(invalid());
    }
    Ok((host.to_string(), port))
}
