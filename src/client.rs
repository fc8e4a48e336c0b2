//! The request client.
//!
//! A `Client` owns one `ClientConfig` behind a mutex and one `Transport`.
//! Setters mutate the configuration; the first exchange after a change
//! publishes the new configuration into the transport, under the same mutex,
//! so the transport never sees a half-applied update.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::debug;

use crate::config::{ClientConfig, TlsPolicy, DEFAULT_USER_AGENT};
use crate::dial::DialFn;
use crate::error_handling::{Error, TransportError};
use crate::initialization::init_tls_config;
use crate::proxy::{self, ProxyEndpoint};
use crate::request::Request;
use crate::transport::{HyperTransport, OutgoingRequest, RawResponse, Transport, WireOptions};

struct ClientState {
    config: ClientConfig,
    /// Bumped by every configuration change
    generation: u64,
    /// Generation last applied to the transport
    published: Option<u64>,
}

struct ClientInner {
    state: Mutex<ClientState>,
    transport: Arc<dyn Transport>,
}

/// HTTP client with pooled connections and a mutable, shared configuration.
///
/// Cloning is cheap; all clones share the same configuration and transport.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use httpx::Client;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), httpx::Error> {
/// let client = Client::new();
/// client
///     .set_read_timeout(Duration::from_secs(5))
///     .set_max_conns_per_host(64);
/// client.set_proxy("socks5://127.0.0.1:1080")?;
///
/// let response = client.r().allow_redirect().get("http://example.com/").await?;
/// println!("{} ({} bytes)", response.status(), response.response_size());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Creates a client with the default configuration and the hyper transport.
    pub fn new() -> Self {
        Self::from_config(ClientConfig::default())
    }

    /// Creates a client from an explicit configuration.
    pub fn from_config(config: ClientConfig) -> Self {
        Self::with_transport(config, Arc::new(HyperTransport::new()))
    }

    /// Creates a client driving a caller-provided transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                state: Mutex::new(ClientState {
                    config,
                    generation: 0,
                    published: None,
                }),
                transport,
            }),
        }
    }

    /// Creates a new request bound to this client.
    pub fn r(&self) -> Request {
        Request::new(self.clone())
    }

    fn lock(&self) -> MutexGuard<'_, ClientState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies several configuration changes as one step.
    ///
    /// Concurrent exchanges observe either none or all of the changes.
    pub fn update<F>(&self, f: F) -> &Self
    where
        F: FnOnce(&mut ClientConfig),
    {
        let mut state = self.lock();
        f(&mut state.config);
        state.generation += 1;
        self
    }

    /// Returns a consistent copy of the current configuration.
    pub fn config(&self) -> ClientConfig {
        self.lock().config.clone()
    }

    /// Deadline for reading a full response.
    ///
    /// The exchange deadline is the sum of the read and write timeouts; when
    /// both are zero requests have no deadline.
    pub fn set_read_timeout(&self, timeout: Duration) -> &Self {
        self.update(|c| c.read_timeout = timeout)
    }

    /// Deadline for writing a full request. See [`Client::set_read_timeout`].
    pub fn set_write_timeout(&self, timeout: Duration) -> &Self {
        self.update(|c| c.write_timeout = timeout)
    }

    /// Idle pooled connections older than this are closed.
    pub fn set_max_idle_conn_duration(&self, duration: Duration) -> &Self {
        self.update(|c| c.max_idle_conn_duration = duration)
    }

    /// How long to wait for a free connection slot when a host is at its limit.
    pub fn set_max_conn_wait_timeout(&self, timeout: Duration) -> &Self {
        self.update(|c| c.max_conn_wait_timeout = timeout)
    }

    /// Per-connection read buffer size.
    pub fn set_read_buffer_size(&self, size: usize) -> &Self {
        self.update(|c| c.read_buffer_size = size)
    }

    /// Per-connection write buffer size.
    pub fn set_write_buffer_size(&self, size: usize) -> &Self {
        self.update(|c| c.write_buffer_size = size)
    }

    /// Zero disables the limit.
    pub fn set_max_response_body_size(&self, size: usize) -> &Self {
        self.update(|c| c.max_response_body_size = size)
    }

    /// Zero disables the cap.
    pub fn set_max_conns_per_host(&self, max: usize) -> &Self {
        self.update(|c| c.max_conns_per_host = max)
    }

    /// When true, requests without an explicit User-Agent send none.
    pub fn set_no_default_user_agent_header(&self, disabled: bool) -> &Self {
        self.update(|c| c.no_default_user_agent_header = disabled)
    }

    /// When true, header names are not rewritten to `Title-Case`.
    pub fn set_disable_header_names_normalizing(&self, disabled: bool) -> &Self {
        self.update(|c| c.disable_header_names_normalizing = disabled)
    }

    /// When true, request paths are sent exactly as given.
    pub fn set_disable_path_normalizing(&self, disabled: bool) -> &Self {
        self.update(|c| c.disable_path_normalizing = disabled)
    }

    /// Sets how server certificates are verified.
    pub fn set_tls_policy(&self, policy: TlsPolicy) -> &Self {
        self.update(|c| c.tls = policy)
    }

    /// Replaces the dial function used for new connections.
    pub fn set_dial(&self, dial: DialFn) -> &Self {
        self.update(|c| c.dial = dial)
    }

    /// Routes new connections through a single proxy.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidProxyUrl` if `proxy` is not a URL
    /// - `Error::ProxyInit` if the scheme is unsupported or the URL has no host
    pub fn set_proxy(&self, proxy: &str) -> Result<&Self, Error> {
        let endpoint = ProxyEndpoint::parse(proxy)?;
        self.install_proxies(vec![endpoint])
    }

    /// Routes new connections through a chain of proxies, first entry outermost.
    ///
    /// Entries are parsed in order and the first invalid one fails the call,
    /// leaving the current dialer in place. An empty list restores direct TCP.
    ///
    /// # Errors
    ///
    /// Same as [`Client::set_proxy`], for the first failing entry.
    pub fn set_proxies<I, S>(&self, proxies: I) -> Result<&Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut endpoints = Vec::new();
        for (index, proxy) in proxies.into_iter().enumerate() {
            let endpoint = ProxyEndpoint::parse(proxy.as_ref()).map_err(|e| match e {
                Error::ProxyInit(msg) => Error::ProxyInit(format!("proxies[{index}]: {msg}")),
                other => other,
            })?;
            endpoints.push(endpoint);
        }
        self.install_proxies(endpoints)
    }

    fn install_proxies(&self, endpoints: Vec<ProxyEndpoint>) -> Result<&Self, Error> {
        let mut state = self.lock();
        let tls = init_tls_config(&state.config.tls).map_err(|e| Error::ProxyInit(e.to_string()))?;
        debug!("Installing {} proxy hop(s)", endpoints.len());
        state.config.dial = proxy::compose(endpoints, tls);
        state.generation += 1;
        Ok(self)
    }

    /// Publishes the configuration into the transport if it changed since the
    /// last publish.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if it rejects the configuration.
    pub fn sync(&self) -> Result<(), TransportError> {
        let mut state = self.lock();
        if state.published == Some(state.generation) {
            return Ok(());
        }
        self.inner.transport.configure(&state.config)?;
        state.published = Some(state.generation);
        debug!("Published client configuration (generation {})", state.generation);
        Ok(())
    }

    /// Publishes pending configuration changes, then performs one exchange.
    ///
    /// Redirects are not followed and nothing is retried.
    ///
    /// # Errors
    ///
    /// Returns the transport's error unmodified.
    pub async fn execute(&self, request: OutgoingRequest) -> Result<RawResponse, TransportError> {
        self.sync()?;
        self.inner.transport.send(request).await
    }

    pub(crate) fn wire_options(&self) -> WireOptions {
        let state = self.lock();
        WireOptions {
            normalize_header_names: !state.config.disable_header_names_normalizing,
            normalize_path: !state.config.disable_path_normalizing,
            default_user_agent: (!state.config.no_default_user_agent_header)
                .then_some(DEFAULT_USER_AGENT),
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.lock().config)
            .finish_non_exhaustive()
    }
}
