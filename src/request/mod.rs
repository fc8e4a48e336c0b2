//! Request builder.
//!
//! A `Request` collects everything needed for one HTTP call (headers,
//! cookies, query and form parameters, body, basic auth, redirect policy) and
//! executes it through its `Client`. Builder methods take `&self`, so one
//! request can be shared between tasks; every mutation is serialized by the
//! request's own mutex.
//!
//! Method and URL are per call. Everything else persists on the request and is
//! sent again by the next call.

mod auth;
mod prepare;
mod redirect;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::client::Client;
use crate::config::{
    DEFAULT_MAX_REDIRECTS_COUNT, METHOD_CONNECT, METHOD_DELETE, METHOD_GET, METHOD_HEAD,
    METHOD_OPTIONS, METHOD_PATCH, METHOD_POST, METHOD_PUT, METHOD_TRACE,
};
use crate::error_handling::Error;
use crate::response::Response;
use crate::transport::{host_header_value, set_header, OutgoingRequest};

pub use auth::BasicAuth;
use redirect::RedirectPolicy;

#[derive(Debug)]
pub(crate) struct RequestState {
    method: String,
    url: String,
    scheme: String,
    host_port: String,
    hostname: String,
    port: String,
    path: String,
    headers: Vec<(String, String)>,
    cookies: BTreeMap<String, String>,
    content_type: String,
    content_length: Option<usize>,
    user_agent: String,
    query_params: BTreeMap<String, Vec<String>>,
    form_data: Option<BTreeMap<String, Vec<String>>>,
    body: Bytes,
    basic_auth: Option<BasicAuth>,
    original_request: Option<OutgoingRequest>,
    allow_redirect: bool,
    allow_save_response_history: bool,
    max_redirects_count: usize,
}

impl Default for RequestState {
    fn default() -> Self {
        Self {
            method: String::new(),
            url: String::new(),
            scheme: String::new(),
            host_port: String::new(),
            hostname: String::new(),
            port: String::new(),
            path: String::new(),
            headers: Vec::new(),
            cookies: BTreeMap::new(),
            content_type: String::new(),
            content_length: None,
            user_agent: String::new(),
            query_params: BTreeMap::new(),
            form_data: None,
            body: Bytes::new(),
            basic_auth: None,
            original_request: None,
            allow_redirect: false,
            allow_save_response_history: false,
            max_redirects_count: DEFAULT_MAX_REDIRECTS_COUNT,
        }
    }
}

impl RequestState {
    fn set_url_components(&mut self, url: &Url) {
        self.url = url.to_string();
        self.scheme = url.scheme().to_string();
        self.host_port = host_header_value(url);
        let host = url.host_str().unwrap_or_default();
        self.hostname = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host)
            .to_string();
        self.port = url.port().map(|p| p.to_string()).unwrap_or_default();
        self.path = url.path().to_string();
    }

    fn redirect_policy(&self) -> RedirectPolicy {
        RedirectPolicy {
            allow_redirect: self.allow_redirect,
            save_history: self.allow_save_response_history,
            max_redirects: self.max_redirects_count,
        }
    }
}

/// A reusable, chainable HTTP request bound to a [`Client`].
pub struct Request {
    client: Client,
    state: Mutex<RequestState>,
}

impl Request {
    pub(crate) fn new(client: Client) -> Self {
        Self {
            client,
            state: Mutex::new(RequestState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RequestState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_state<F>(&self, f: F) -> &Self
    where
        F: FnOnce(&mut RequestState),
    {
        f(&mut self.lock());
        self
    }

    /// Sets the method used when `do_request` is called with an empty method.
    pub fn set_method(&self, method: &str) -> &Self {
        self.with_state(|s| s.method = method.to_string())
    }

    /// Sets a header, replacing any header with the same name (case-insensitive).
    pub fn set_header(&self, key: &str, value: &str) -> &Self {
        self.with_state(|s| set_header(&mut s.headers, key, value.to_string()))
    }

    /// Sets several headers at once.
    pub fn set_headers<I, K, V>(&self, headers: I) -> &Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in headers {
            self.set_header(key.as_ref(), value.as_ref());
        }
        self
    }

    /// Adds a cookie to the `Cookie` header.
    pub fn set_cookie(&self, key: &str, value: &str) -> &Self {
        self.with_state(|s| {
            s.cookies.insert(key.to_string(), value.to_string());
        })
    }

    /// Adds several cookies at once.
    pub fn set_cookies<I, K, V>(&self, cookies: I) -> &Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in cookies {
            self.set_cookie(key.as_ref(), value.as_ref());
        }
        self
    }

    /// Sets the `Content-Type` header.
    pub fn set_content_type(&self, content_type: &str) -> &Self {
        self.with_state(|s| s.content_type = content_type.to_string())
    }

    /// Sets the content length. A request with a body always sends the
    /// computed length instead.
    pub fn set_content_length(&self, length: usize) -> &Self {
        self.with_state(|s| s.content_length = Some(length))
    }

    /// Overrides the client default User-Agent for this request.
    pub fn set_user_agent(&self, user_agent: &str) -> &Self {
        self.with_state(|s| s.user_agent = user_agent.to_string())
    }

    /// Sets a query parameter. Builder values win over the URL's own values for the same key.
    pub fn set_query_param(&self, key: &str, value: &str) -> &Self {
        self.with_state(|s| {
            s.query_params
                .insert(key.to_string(), vec![value.to_string()]);
        })
    }

    /// Merges several query parameters into the URL.
    pub fn set_query_params<I, K, V>(&self, params: I) -> &Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in params {
            self.set_query_param(key.as_ref(), value.as_ref());
        }
        self
    }

    /// Sets a form field. Form data replaces the raw body when present.
    pub fn set_form_data(&self, key: &str, value: &str) -> &Self {
        self.with_state(|s| {
            s.form_data
                .get_or_insert_with(BTreeMap::new)
                .insert(key.to_string(), vec![value.to_string()]);
        })
    }

    /// Sets several form fields at once.
    pub fn set_form_datas<I, K, V>(&self, params: I) -> &Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in params {
            self.set_form_data(key.as_ref(), value.as_ref());
        }
        self
    }

    /// Raw request body. Ignored when form data is set.
    pub fn set_body(&self, body: impl Into<Bytes>) -> &Self {
        let body = body.into();
        self.with_state(|s| s.body = body)
    }

    /// Raw request body from a string.
    pub fn set_body_string(&self, body: impl Into<String>) -> &Self {
        let body = Bytes::from(body.into());
        self.with_state(|s| s.body = body)
    }

    /// Sends `Authorization: Basic` with these credentials.
    pub fn set_basic_auth(&self, username: &str, password: &str) -> &Self {
        self.with_state(|s| {
            s.basic_auth = Some(BasicAuth {
                username: username.to_string(),
                password: password.to_string(),
            })
        })
    }

    /// Follows redirects (off by default).
    pub fn allow_redirect(&self) -> &Self {
        self.with_state(|s| s.allow_redirect = true)
    }

    /// Records every response of a redirect chain on the final response.
    pub fn allow_save_response_history(&self) -> &Self {
        self.with_state(|s| s.allow_save_response_history = true)
    }

    /// Maximum number of redirects followed before failing. Defaults to 5.
    pub fn set_max_redirects_count(&self, max: usize) -> &Self {
        self.with_state(|s| s.max_redirects_count = max)
    }

    /// Method of the last call (or the one set with `set_method`).
    pub fn method(&self) -> String {
        self.lock().method.clone()
    }

    /// URL of the last call, with merged query parameters.
    pub fn url(&self) -> String {
        self.lock().url.clone()
    }

    /// Scheme of the last prepared URL.
    pub fn scheme(&self) -> String {
        self.lock().scheme.clone()
    }

    /// `host[:port]` of the last call; the port appears only when explicit.
    pub fn host_port(&self) -> String {
        self.lock().host_port.clone()
    }

    /// Host of the last prepared URL, without the port.
    pub fn hostname(&self) -> String {
        self.lock().hostname.clone()
    }

    /// Explicit port of the last call, empty when the URL had none.
    pub fn port(&self) -> String {
        self.lock().port.clone()
    }

    /// Path of the last prepared URL.
    pub fn path(&self) -> String {
        self.lock().path.clone()
    }

    /// Content length sent by the last call, or the one set explicitly.
    pub fn content_length(&self) -> Option<usize> {
        self.lock().content_length
    }

    /// The request sent by the last call, before any redirect.
    pub fn original_request(&self) -> Option<OutgoingRequest> {
        self.lock().original_request.clone()
    }

    /// Executes the request.
    ///
    /// An empty `method` falls back to the one set with `set_method`.
    ///
    /// # Errors
    ///
    /// - `EmptyMethod`, `EmptyUrl`, `InvalidMethod`, `UrlParse`,
    ///   `UnsupportedScheme`, `InvalidHeader` before any network I/O
    /// - `Transport` when an exchange fails
    /// - `TooManyRedirects`, `MissingLocation` while following redirects
    pub async fn do_request(&self, url: &str, method: &str) -> Result<Response, Error> {
        self.run(url, method, None).await
    }

    /// Like [`Request::do_request`], aborting with `Error::Cancelled` once `cancel` fires.
    pub async fn do_request_with_cancel(
        &self,
        url: &str,
        method: &str,
        cancel: &CancellationToken,
    ) -> Result<Response, Error> {
        self.run(url, method, Some(cancel)).await
    }

    async fn run(
        &self,
        url: &str,
        method: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<Response, Error> {
        let wire = self.client.wire_options();
        let (outgoing, policy) = {
            let mut state = self.lock();
            let method = if !method.is_empty() {
                method.to_string()
            } else if !state.method.is_empty() {
                state.method.clone()
            } else {
                return Err(Error::EmptyMethod);
            };
            if url.is_empty() {
                return Err(Error::EmptyUrl);
            }

            let outgoing = prepare::prepare(&mut state, url, &method, &wire)?;
            state.method = method;
            (outgoing, state.redirect_policy())
        };

        redirect::follow(&self.client, outgoing, policy, wire.normalize_path, cancel).await
    }

    /// Sends a `GET` request to `url`.
    pub async fn get(&self, url: &str) -> Result<Response, Error> {
        self.do_request(url, METHOD_GET).await
    }

    /// Sends a `HEAD` request to `url`.
    pub async fn head(&self, url: &str) -> Result<Response, Error> {
        self.do_request(url, METHOD_HEAD).await
    }

    /// Sends a `POST` request to `url`.
    pub async fn post(&self, url: &str) -> Result<Response, Error> {
        self.do_request(url, METHOD_POST).await
    }

    /// Sends a `PUT` request to `url`.
    pub async fn put(&self, url: &str) -> Result<Response, Error> {
        self.do_request(url, METHOD_PUT).await
    }

    /// Sends a `PATCH` request to `url`.
    pub async fn patch(&self, url: &str) -> Result<Response, Error> {
        self.do_request(url, METHOD_PATCH).await
    }

    /// Sends a `DELETE` request to `url`.
    pub async fn delete(&self, url: &str) -> Result<Response, Error> {
        self.do_request(url, METHOD_DELETE).await
    }

    /// Sends a `CONNECT` request to `url`.
    pub async fn connect(&self, url: &str) -> Result<Response, Error> {
        self.do_request(url, METHOD_CONNECT).await
    }

    /// Sends an `OPTIONS` request to `url`.
    pub async fn options(&self, url: &str) -> Result<Response, Error> {
        self.do_request(url, METHOD_OPTIONS).await
    }

    /// Sends a `TRACE` request to `url`.
    pub async fn trace(&self, url: &str) -> Result<Response, Error> {
        self.do_request(url, METHOD_TRACE).await
    }
}

impl fmt::Display for Request {
    /// Writes the raw dump of the last request sent, empty before the first call.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lock().original_request {
            Some(request) => fmt::Display::fmt(request, f),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("state", &*self.lock())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::error_handling::{ErrorKind, TransportError};
    use crate::transport::{RawResponse, Transport};
    use async_trait::async_trait;
    use std::sync::Arc;

    #[derive(Default)]
    struct EchoTransport {
        seen: Mutex<Vec<OutgoingRequest>>,
    }

    #[async_trait]
    impl Transport for EchoTransport {
        fn configure(&self, _config: &ClientConfig) -> Result<(), TransportError> {
            Ok(())
        }

        async fn send(&self, request: OutgoingRequest) -> Result<RawResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            Ok(RawResponse {
                status: 200,
                header_bytes: Bytes::from_static(b"HTTP/1.1 200 OK\r\n\r\n"),
                content_length: -1,
                body: Bytes::from_static(b"ok"),
            })
        }
    }

    fn echo_client() -> (Client, Arc<EchoTransport>) {
        let transport = Arc::new(EchoTransport::default());
        let client = Client::with_transport(ClientConfig::default(), transport.clone());
        (client, transport)
    }

    #[tokio::test]
    async fn test_empty_method_and_url() {
        let (client, transport) = echo_client();
        let request = client.r();

        let err = request.do_request("http://a.test/", "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyMethod);

        let err = request.do_request("", "GET").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyUrl);
        assert!(transport.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_method_used_as_fallback() {
        let (client, transport) = echo_client();
        let request = client.r();
        request.set_method("PURGE");
        request.do_request("http://a.test/cache", "").await.unwrap();

        assert_eq!(transport.seen.lock().unwrap()[0].method.as_str(), "PURGE");
        assert_eq!(request.method(), "PURGE");
    }

    #[tokio::test]
    async fn test_verbs_and_accessors() {
        let (client, transport) = echo_client();
        let request = client.r();
        request
            .set_query_param("k", "v")
            .set_header("X-A", "1")
            .set_cookies([("s", "1")]);

        let response = request.put("https://[::1]:8443/a/b?x=1").await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.content_length(), 2);

        assert_eq!(request.method(), "PUT");
        assert_eq!(request.url(), "https://[::1]:8443/a/b?k=v&x=1");
        assert_eq!(request.scheme(), "https");
        assert_eq!(request.host_port(), "[::1]:8443");
        assert_eq!(request.hostname(), "::1");
        assert_eq!(request.port(), "8443");
        assert_eq!(request.path(), "/a/b");

        let dump = request.to_string();
        assert!(dump.starts_with("PUT /a/b?k=v&x=1 HTTP/1.1\r\n"));
        assert!(dump.contains("X-A: 1\r\n"));
        assert!(dump.contains("Cookie: s=1\r\n"));

        request.delete("http://a.test/").await.unwrap();
        request.head("http://a.test/").await.unwrap();
        let methods: Vec<String> = transport
            .seen
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.method.to_string())
            .collect();
        assert_eq!(methods, vec!["PUT", "DELETE", "HEAD"]);
    }

    #[tokio::test]
    async fn test_repeated_calls_do_not_accumulate_url_params() {
        let (client, transport) = echo_client();
        let request = client.r();
        request.set_query_param("b", "2");
        request.get("http://a.test/?a=1").await.unwrap();
        request.get("http://a.test/").await.unwrap();

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].request_target, "/?a=1&b=2");
        assert_eq!(seen[1].request_target, "/?b=2");
    }

    #[tokio::test]
    async fn test_plural_setters_last_write_wins() {
        let (client, transport) = echo_client();
        let request = client.r();
        request
            .set_headers([("x-token", "old"), ("X-Token", "new")])
            .set_form_datas(vec![("a".to_string(), "1".to_string())])
            .set_form_data("a", "2");
        request.post("http://a.test/").await.unwrap();

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].header("x-token"), Some("new"));
        assert_eq!(&seen[0].body[..], b"a=2");
        assert_eq!(request.content_length(), Some(3));
    }
}
