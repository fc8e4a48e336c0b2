//! Wire-level request and response values exchanged with a [`Transport`](super::Transport).

use std::fmt;

use bytes::Bytes;
use http::uri::PathAndQuery;
use http::Method;
use url::Url;

use crate::config::HEADER_HOST;

/// A fully prepared request, ready to be written on the wire.
///
/// Header names are kept as the caller wrote them; whether they are
/// normalized is up to the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingRequest {
    #[allow(missing_docs)]
    pub method: Method,
    /// Absolute URL of this hop
    pub url: Url,
    /// Path and query written on the request line
    pub request_target: String,
    /// Headers in send order
    pub headers: Vec<(String, String)>,
    #[allow(missing_docs)]
    pub body: Bytes,
}

impl OutgoingRequest {
    /// Returns the value of the first header named `name`, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replaces the header named `name` in place, or appends it.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        set_header(&mut self.headers, name, value.into());
    }

    /// Removes every header named `name`.
    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    /// `host[:port]` as sent in the `Host` header.
    pub fn authority(&self) -> String {
        host_header_value(&self.url)
    }

    /// Points this request at the next hop of a redirect chain.
    ///
    /// `raw` is the location as received, used to keep the path untouched when
    /// path normalization is off.
    pub fn redirect_to(&mut self, url: Url, raw: Option<&str>, normalize_path: bool) {
        self.request_target = request_target(&url, raw, normalize_path);
        let host = host_header_value(&url);
        self.url = url;
        self.set_header(HEADER_HOST, host);
    }
}

impl fmt::Display for OutgoingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} HTTP/1.1\r\n", self.method, self.request_target)?;
        for (name, value) in &self.headers {
            write!(f, "{name}: {value}\r\n")?;
        }
        f.write_str("\r\n")?;
        f.write_str(&String::from_utf8_lossy(&self.body))
    }
}

/// What a transport hands back for one exchange.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawResponse {
    /// Status code
    pub status: u16,
    /// Status line, header lines and the terminating blank line
    pub header_bytes: Bytes,
    /// Content length as reported by the transport, negative when unknown
    pub content_length: i64,
    /// Complete response body
    pub body: Bytes,
}

/// Per-request wire settings derived from the client configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WireOptions {
    /// Send header names in `Title-Case`
    pub normalize_header_names: bool,
    /// Remove dot segments and repeated slashes from paths
    pub normalize_path: bool,
    /// User-Agent to send when the request sets none
    pub default_user_agent: Option<&'static str>,
}

/// Case-insensitive last-write-wins header assignment, keeping the original position.
pub(crate) fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
        Some(entry) => {
            entry.0 = name.to_string();
            entry.1 = value;
        }
        None => headers.push((name.to_string(), value)),
    }
}

/// Canonical `Title-Case` form of a header name (`content-type` -> `Content-Type`).
pub fn canonical_header_name(name: &str) -> String {
    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

/// Value of the `Host` header for `url`: the port is omitted when it is the scheme default.
pub(crate) fn host_header_value(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Builds the request-line target for `url`.
///
/// With normalization on, the parsed path is used with repeated slashes
/// collapsed. With normalization off, the path is taken verbatim from `raw`
/// (dot segments and repeated slashes kept) as long as it is a valid request
/// target.
pub(crate) fn request_target(url: &Url, raw: Option<&str>, normalize_path: bool) -> String {
    let path = if normalize_path {
        collapse_slashes(url.path())
    } else {
        raw.and_then(raw_path)
            .filter(|p| p.parse::<PathAndQuery>().is_ok())
            .map(str::to_string)
            .unwrap_or_else(|| url.path().to_string())
    };
    let path = if path.is_empty() { "/".to_string() } else { path };

    match url.query() {
        Some(query) if !query.is_empty() => format!("{path}?{query}"),
        _ => path,
    }
}

/// Path component of an absolute URL string, as written.
fn raw_path(raw: &str) -> Option<&str> {
    let (_, rest) = raw.split_once("://")?;
    let authority_end = rest.find(|c| c == '/' || c == '?' || c == '#')?;
    let rest = &rest[authority_end..];
    if !rest.starts_with('/') {
        return None;
    }
    let end = rest.find(|c| c == '?' || c == '#').unwrap_or(rest.len());
    Some(&rest[..end])
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' && previous_slash {
            continue;
        }
        previous_slash = c == '/';
        out.push(c);
    }
    out
}
