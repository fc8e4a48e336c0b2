//! hyper-backed transport with connection pooling.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper_util::client::legacy::Client as LegacyClient;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use log::debug;
use tokio_rustls::TlsConnector;

use super::connector::{DialConnector, HostSlots};
use super::message::{canonical_header_name, OutgoingRequest, RawResponse};
use super::Transport;
use crate::config::{ClientConfig, MIN_READ_BUFFER_SIZE};
use crate::error_handling::{TransportError, TransportErrorKind};
use crate::initialization::init_tls_config;

/// One published configuration: a pooled client plus the limits it enforces.
struct LiveClient {
    client: LegacyClient<DialConnector, Full<Bytes>>,
    /// `None` when both read and write timeouts are zero
    exchange_timeout: Option<Duration>,
    max_body_size: usize,
    normalize_header_names: bool,
}

/// Default [`Transport`]: hyper's pooled HTTP/1.1 client over the configured dialer.
///
/// Every `configure` call replaces the live client. Requests already in flight
/// keep the client (and pool) they started with.
#[derive(Default)]
pub struct HyperTransport {
    live: ArcSwapOption<LiveClient>,
}

impl HyperTransport {
    /// Creates an unconfigured transport; the client configures it before the first exchange.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for HyperTransport {
    fn configure(&self, config: &ClientConfig) -> Result<(), TransportError> {
        let tls = init_tls_config(&config.tls)
            .map_err(|e| TransportError::new(TransportErrorKind::Tls, e))?;

        let connector = DialConnector {
            dial: Arc::clone(&config.dial),
            tls: TlsConnector::from(tls),
            slots: Arc::new(HostSlots::new(
                config.max_conns_per_host,
                config.max_conn_wait_timeout,
            )),
            read_buffer_size: config.read_buffer_size.max(1),
            write_buffer_size: config.write_buffer_size.max(1),
        };

        let client = LegacyClient::builder(TokioExecutor::new())
            .pool_idle_timeout(config.max_idle_conn_duration)
            .pool_max_idle_per_host(if config.max_conns_per_host == 0 {
                usize::MAX
            } else {
                config.max_conns_per_host
            })
            .pool_timer(TokioTimer::new())
            .http1_title_case_headers(!config.disable_header_names_normalizing)
            .http1_max_buf_size(config.read_buffer_size.max(MIN_READ_BUFFER_SIZE))
            .build(connector);

        let exchange_timeout = config.write_timeout.saturating_add(config.read_timeout);
        let exchange_timeout = (!exchange_timeout.is_zero()).then_some(exchange_timeout);

        self.live.store(Some(Arc::new(LiveClient {
            client,
            exchange_timeout,
            max_body_size: config.max_response_body_size,
            normalize_header_names: !config.disable_header_names_normalizing,
        })));
        debug!(
            "Transport configured (max conns per host {}, exchange timeout {:?})",
            config.max_conns_per_host, exchange_timeout
        );
        Ok(())
    }

    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse, TransportError> {
        let live = self.live.load_full().ok_or_else(|| {
            TransportError::new(TransportErrorKind::Other, "transport used before configure")
        })?;

        let http_request = build_http_request(request)?;
        let Some(deadline) = live.exchange_timeout else {
            return exchange(&live, http_request).await;
        };
        match tokio::time::timeout(deadline, exchange(&live, http_request)).await {
            Ok(result) => result,
            Err(elapsed) => Err(TransportError::new(TransportErrorKind::Timeout, elapsed)),
        }
    }
}

fn build_http_request(request: OutgoingRequest) -> Result<http::Request<Full<Bytes>>, TransportError> {
    let protocol = |e: http::Error| TransportError::new(TransportErrorKind::Protocol, e);

    let uri: http::Uri = format!(
        "{}://{}{}",
        request.url.scheme(),
        request.authority(),
        request.request_target
    )
    .parse()
    .map_err(|e: http::uri::InvalidUri| protocol(e.into()))?;

    let mut builder = http::Request::builder().method(request.method).uri(uri);
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder.body(Full::new(request.body)).map_err(protocol)
}

async fn exchange(
    live: &LiveClient,
    request: http::Request<Full<Bytes>>,
) -> Result<RawResponse, TransportError> {
    let head_request = request.method() == http::Method::HEAD;
    let response = live
        .client
        .request(request)
        .await
        .map_err(TransportError::from_source)?;

    let status = response.status();
    let content_length = response
        .headers()
        .get(http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(-1);

    if may_have_body(head_request, status) && exceeds_limit(content_length, live.max_body_size) {
        return Err(TransportError::new(
            TransportErrorKind::BodyTooLarge,
            format!(
                "content length {content_length} exceeds the limit of {} bytes",
                live.max_body_size
            ),
        ));
    }

    let header_bytes = serialize_head(&response, live.normalize_header_names);
    let body = collect_body(response.into_body(), live.max_body_size).await?;

    Ok(RawResponse {
        status: status.as_u16(),
        header_bytes,
        content_length,
        body,
    })
}

/// Responses to `HEAD` and 1xx/204/304 responses never carry a body,
/// whatever their `Content-Length` says.
fn may_have_body(head_request: bool, status: http::StatusCode) -> bool {
    !(head_request
        || status.is_informational()
        || status == http::StatusCode::NO_CONTENT
        || status == http::StatusCode::NOT_MODIFIED)
}

/// A limit of zero disables the check.
fn exceeds_limit(content_length: i64, limit: usize) -> bool {
    match u64::try_from(content_length) {
        Ok(length) => limit > 0 && length > limit as u64,
        Err(_) => false,
    }
}

async fn collect_body(body: Incoming, limit: usize) -> Result<Bytes, TransportError> {
    if limit == 0 {
        let collected = body.collect().await.map_err(TransportError::from_source)?;
        return Ok(collected.to_bytes());
    }
    let collected = Limited::new(body, limit)
        .collect()
        .await
        .map_err(TransportError::from_source)?;
    Ok(collected.to_bytes())
}

/// Serializes the response head the way it would appear on the wire.
fn serialize_head(response: &http::Response<Incoming>, normalize: bool) -> Bytes {
    let status = response.status();
    let version = match response.version() {
        http::Version::HTTP_10 => "HTTP/1.0",
        _ => "HTTP/1.1",
    };

    let mut head = BytesMut::with_capacity(256);
    head.put_slice(
        format!(
            "{} {} {}\r\n",
            version,
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        )
        .as_bytes(),
    );
    for (name, value) in response.headers() {
        if normalize {
            head.put_slice(canonical_header_name(name.as_str()).as_bytes());
        } else {
            head.put_slice(name.as_str().as_bytes());
        }
        head.put_slice(b": ");
        head.put_slice(value.as_bytes());
        head.put_slice(b"\r\n");
    }
    head.put_slice(b"\r\n");
    head.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::TransportErrorKind;
    use bytes::Bytes;
    use http::Method;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use url::Url;

    fn request_for(url: &str) -> OutgoingRequest {
        let url = Url::parse(url).unwrap();
        OutgoingRequest {
            method: Method::GET,
            request_target: url.path().to_string(),
            headers: vec![("Host".into(), super::super::message::host_header_value(&url))],
            url,
            body: Bytes::new(),
        }
    }

    /// Serves one canned HTTP response per connection and returns the raw requests seen.
    async fn spawn_raw_server(response: &'static [u8]) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let mut read = 0;
                    while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf[read..]).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => read += n,
                        }
                    }
                    let _ = socket.write_all(response).await;
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_send_before_configure_fails() {
        let transport = HyperTransport::new();
        let err = transport
            .send(request_for("http://127.0.0.1:1/"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::Other);
    }

    #[tokio::test]
    async fn test_send_returns_raw_head_and_body() {
        let addr = spawn_raw_server(
            b"HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: 5\r\n\r\nhello",
        )
        .await;
        let transport = HyperTransport::new();
        let config = ClientConfig {
            disable_header_names_normalizing: false,
            ..ClientConfig::default()
        };
        transport.configure(&config).unwrap();

        let raw = transport
            .send(request_for(&format!("http://{addr}/")))
            .await
            .unwrap();
        assert_eq!(raw.status, 200);
        assert_eq!(raw.content_length, 5);
        assert_eq!(&raw.body[..], b"hello");
        let head = String::from_utf8(raw.header_bytes.to_vec()).unwrap();
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(head.contains("Content-Type: text/plain\r\n"));
        assert!(head.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_body_over_limit_fails() {
        let addr = spawn_raw_server(
            b"HTTP/1.1 200 OK\r\ncontent-length: 10\r\n\r\n0123456789",
        )
        .await;
        let transport = HyperTransport::new();
        let config = ClientConfig {
            max_response_body_size: 4,
            ..ClientConfig::default()
        };
        transport.configure(&config).unwrap();

        let err = transport
            .send(request_for(&format!("http://{addr}/")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::BodyTooLarge);
    }

    #[tokio::test]
    async fn test_head_response_ignores_body_limit() {
        let addr = spawn_raw_server(b"HTTP/1.1 200 OK\r\ncontent-length: 50000000\r\n\r\n").await;
        let transport = HyperTransport::new();
        transport.configure(&ClientConfig::default()).unwrap();

        let mut request = request_for(&format!("http://{addr}/"));
        request.method = Method::HEAD;
        let raw = transport.send(request).await.unwrap();
        assert_eq!(raw.status, 200);
        assert_eq!(raw.content_length, 50_000_000);
        assert!(raw.body.is_empty());
    }

    #[tokio::test]
    async fn test_not_modified_ignores_body_limit() {
        let addr = spawn_raw_server(b"HTTP/1.1 304 Not Modified\r\ncontent-length: 50000000\r\n\r\n").await;
        let transport = HyperTransport::new();
        transport.configure(&ClientConfig::default()).unwrap();

        let raw = transport
            .send(request_for(&format!("http://{addr}/")))
            .await
            .unwrap();
        assert_eq!(raw.status, 304);
        assert!(raw.body.is_empty());
    }

    #[tokio::test]
    async fn test_max_usize_limit_accepts_body() {
        let addr = spawn_raw_server(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\n\r\nok").await;
        let transport = HyperTransport::new();
        let config = ClientConfig {
            max_response_body_size: usize::MAX,
            ..ClientConfig::default()
        };
        transport.configure(&config).unwrap();

        let raw = transport
            .send(request_for(&format!("http://{addr}/")))
            .await
            .unwrap();
        assert_eq!(&raw.body[..], b"ok");
    }

    #[tokio::test]
    async fn test_zero_timeouts_disable_deadline() {
        let addr = spawn_raw_server(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\n\r\nok").await;
        let transport = HyperTransport::new();
        let config = ClientConfig {
            read_timeout: Duration::ZERO,
            write_timeout: Duration::ZERO,
            ..ClientConfig::default()
        };
        transport.configure(&config).unwrap();

        let raw = transport
            .send(request_for(&format!("http://{addr}/")))
            .await
            .unwrap();
        assert_eq!(raw.status, 200);
    }

    #[test]
    fn test_exceeds_limit() {
        assert!(exceeds_limit(11, 10));
        assert!(!exceeds_limit(10, 10));
        assert!(!exceeds_limit(-1, 10));
        assert!(!exceeds_limit(i64::MAX, 0));
        assert!(!exceeds_limit(i64::MAX, usize::MAX));
    }

    #[tokio::test]
    async fn test_chunked_body_over_limit_fails() {
        let addr = spawn_raw_server(
            b"HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\na\r\n0123456789\r\n0\r\n\r\n",
        )
        .await;
        let transport = HyperTransport::new();
        let config = ClientConfig {
            max_response_body_size: 4,
            ..ClientConfig::default()
        };
        transport.configure(&config).unwrap();

        let err = transport
            .send(request_for(&format!("http://{addr}/")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::BodyTooLarge);
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let transport = HyperTransport::new();
        let config = ClientConfig {
            read_timeout: Duration::from_millis(100),
            write_timeout: Duration::from_millis(100),
            ..ClientConfig::default()
        };
        transport.configure(&config).unwrap();

        let err = transport
            .send(request_for(&format!("http://{addr}/")))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_refused_connection_is_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HyperTransport::new();
        transport.configure(&ClientConfig::default()).unwrap();
        let err = transport
            .send(request_for(&format!("http://{addr}/")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::Connect);
    }
}
