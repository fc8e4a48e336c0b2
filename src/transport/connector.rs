//! Connector plugged into the pooled hyper client.
//!
//! For every new connection the connector waits for a free per-host slot,
//! calls the configured dial function, wraps `https` targets in TLS and
//! buffers the stream with the configured buffer sizes.

use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::BoxFuture;
use http::Uri;
use hyper_util::client::legacy::connect::{Connected, Connection};
use hyper_util::rt::TokioIo;
use log::debug;
use rustls::pki_types::ServerName;
use tokio::io::BufStream;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_rustls::TlsConnector;

use crate::dial::{BoxConn, DialFn};
use crate::error_handling::NoFreeConnections;

/// Per-host connection slots.
///
/// A slot is taken when a connection is opened and released when the
/// connection is dropped, pooled idle time included.
pub(crate) struct HostSlots {
    limit: usize,
    wait: Duration,
    hosts: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl HostSlots {
    /// `limit` of zero disables the cap.
    pub(crate) fn new(limit: usize, wait: Duration) -> Self {
        Self {
            limit,
            wait,
            hosts: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) async fn acquire(&self, host: &str) -> io::Result<Option<OwnedSemaphorePermit>> {
        if self.limit == 0 {
            return Ok(None);
        }

        let semaphore = {
            let mut hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(
                hosts
                    .entry(host.to_string())
                    .or_insert_with(|| Arc::new(Semaphore::new(self.limit))),
            )
        };

        match tokio::time::timeout(self.wait, semaphore.acquire_owned()).await {
            Ok(Ok(permit)) => Ok(Some(permit)),
            Ok(Err(closed)) => Err(io::Error::other(closed)),
            Err(_) => Err(io::Error::other(NoFreeConnections {
                host: host.to_string(),
            })),
        }
    }
}

/// `tower_service::Service<Uri>` used by the legacy hyper client to open connections.
#[derive(Clone)]
pub(crate) struct DialConnector {
    pub(crate) dial: DialFn,
    pub(crate) tls: TlsConnector,
    pub(crate) slots: Arc<HostSlots>,
    pub(crate) read_buffer_size: usize,
    pub(crate) write_buffer_size: usize,
}

impl DialConnector {
    async fn connect(self, uri: Uri) -> io::Result<DialedConn> {
        let host = uri
            .host()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("no host in {uri}")))?;
        let https = uri.scheme_str() == Some("https");
        let port = uri.port_u16().unwrap_or(if https { 443 } else { 80 });
        let addr = format!("{host}:{port}");

        let permit = self.slots.acquire(&addr).await?;
        debug!("Dialing {}", addr);
        let stream = self.dial.dial(&addr).await?;

        let stream: BoxConn = if https {
            let name = host.trim_start_matches('[').trim_end_matches(']');
            let server_name = ServerName::try_from(name.to_string())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            Box::new(self.tls.connect(server_name, stream).await?)
        } else {
            stream
        };

        let buffered: BoxConn = Box::new(BufStream::with_capacity(
            self.read_buffer_size,
            self.write_buffer_size,
            stream,
        ));

        Ok(DialedConn {
            io: TokioIo::new(buffered),
            _permit: permit,
        })
    }
}

impl tower_service::Service<Uri> for DialConnector {
    type Response = DialedConn;
    type Error = io::Error;
    type Future = BoxFuture<'static, io::Result<DialedConn>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        let connector = self.clone();
        Box::pin(connector.connect(uri))
    }
}

/// A dialed connection holding its host slot until dropped.
pub(crate) struct DialedConn {
    io: TokioIo<BoxConn>,
    _permit: Option<OwnedSemaphorePermit>,
}

impl hyper::rt::Read for DialedConn {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: hyper::rt::ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        hyper::rt::Read::poll_read(Pin::new(&mut self.get_mut().io), cx, buf)
    }
}

impl hyper::rt::Write for DialedConn {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        hyper::rt::Write::poll_write(Pin::new(&mut self.get_mut().io), cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        hyper::rt::Write::poll_flush(Pin::new(&mut self.get_mut().io), cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        hyper::rt::Write::poll_shutdown(Pin::new(&mut self.get_mut().io), cx)
    }
}

impl Connection for DialedConn {
    fn connected(&self) -> Connected {
        Connected::new()
    }
}
