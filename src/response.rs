//! Response snapshots.
//!
//! A `Response` is an immutable snapshot of one exchange: status, parsed and
//! raw headers, body, computed sizes, the redirect location and the request
//! that produced it. The terminal response of a redirect-following call can
//! also carry the history of every response in the chain.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::config::{HEADER_LOCATION, HEADER_LOCATION_LOWER};
use crate::transport::{OutgoingRequest, RawResponse};

/// Response headers keyed by name as received. Later duplicates win.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Header(HashMap<String, String>);

impl Header {
    /// Parses a raw header block.
    ///
    /// Every line is trimmed and split on its first colon; lines without a
    /// colon (the status line, the blank terminator) are skipped.
    pub fn parse(raw: &[u8]) -> Self {
        let mut map = HashMap::new();
        for line in raw.split(|b| *b == b'\n') {
            let line = String::from_utf8_lossy(line);
            let Some((key, value)) = line.trim().split_once(':') else {
                continue;
            };
            map.insert(key.trim().to_string(), value.trim().to_string());
        }
        Self(map)
    }

    /// Looks up a header by its exact name.
    ///
    /// Names are stored as received. With header-name normalization off (the
    /// default) they arrive in lower case, so `get("Content-Type")` misses;
    /// use [`Header::get_ignore_case`] for case-independent lookups.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Looks up a header ignoring ASCII case.
    pub fn get_ignore_case(&self, key: &str) -> Option<&str> {
        self.get(key).or_else(|| {
            self.0
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str())
        })
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no headers were parsed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(name, value)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Snapshot {
    status: u16,
    header: Header,
    header_bytes: Bytes,
    body: Bytes,
    content_length: usize,
    response_size: usize,
    location: String,
    request: OutgoingRequest,
}

/// Immutable snapshot of one HTTP exchange. Cloning is cheap.
#[derive(Clone, Debug)]
pub struct Response {
    snapshot: Arc<Snapshot>,
    history: Vec<Response>,
}

impl Response {
    /// Builds a snapshot from what the transport returned for `request`.
    pub(crate) fn from_exchange(raw: RawResponse, request: OutgoingRequest) -> Self {
        let header = Header::parse(&raw.header_bytes);
        let location = header
            .get(HEADER_LOCATION_LOWER)
            .or_else(|| header.get(HEADER_LOCATION))
            .or_else(|| header.get_ignore_case(HEADER_LOCATION))
            .unwrap_or_default()
            .to_string();
        let content_length = usize::try_from(raw.content_length).unwrap_or(raw.body.len());
        let response_size = raw.header_bytes.len() + raw.body.len();

        Self {
            snapshot: Arc::new(Snapshot {
                status: raw.status,
                header,
                header_bytes: raw.header_bytes,
                body: raw.body,
                content_length,
                response_size,
                location,
                request,
            }),
            history: Vec::new(),
        }
    }

    pub(crate) fn with_history(mut self, history: Vec<Response>) -> Self {
        self.history = history;
        self
    }

    /// Status code
    pub fn status(&self) -> u16 {
        self.snapshot.status
    }

    /// Parsed response headers.
    pub fn header(&self) -> &Header {
        &self.snapshot.header
    }

    /// Raw header block: status line, header lines and the blank terminator.
    pub fn header_bytes(&self) -> &[u8] {
        &self.snapshot.header_bytes
    }

    /// Raw head as text.
    pub fn header_string(&self) -> String {
        String::from_utf8_lossy(&self.snapshot.header_bytes).into_owned()
    }

    /// Raw response body.
    pub fn body(&self) -> &[u8] {
        &self.snapshot.body
    }

    /// Body decoded as UTF-8, lossily.
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.snapshot.body).into_owned()
    }

    /// Reported content length, or the body length when none was reported.
    pub fn content_length(&self) -> usize {
        self.snapshot.content_length
    }

    /// Header block size plus body size.
    pub fn response_size(&self) -> usize {
        self.snapshot.response_size
    }

    /// Redirect target, empty when the response has no `Location` header.
    pub fn location(&self) -> &str {
        &self.snapshot.location
    }

    /// Every response of the redirect chain, final one last. Empty unless the
    /// call followed redirects with history saving enabled.
    pub fn response_history(&self) -> &[Response] {
        &self.history
    }

    /// The request that produced this response.
    pub fn request(&self) -> &OutgoingRequest {
        &self.snapshot.request
    }
}

impl PartialEq for Response {
    /// Two responses are equal when they snapshot the same exchange; history is ignored.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.snapshot, &other.snapshot) || self.snapshot == other.snapshot
    }
}

impl Eq for Response {}

impl fmt::Display for Response {
    /// Writes the raw header block followed by the body.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header_string())?;
        f.write_str(&self.body_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn request() -> OutgoingRequest {
        OutgoingRequest {
            method: Method::GET,
            url: url::Url::parse("http://a.test/").unwrap(),
            request_target: "/".into(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    fn raw(head: &'static str, body: &'static str, content_length: i64) -> RawResponse {
        RawResponse {
            status: 302,
            header_bytes: Bytes::from_static(head.as_bytes()),
            content_length,
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[test]
    fn test_header_parsing() {
        let header = Header::parse(
            b"HTTP/1.1 200 OK\r\nServer: test\r\nX-Time: 12:30:01\r\nbroken line\r\nserver: second\r\n\r\n",
        );
        assert_eq!(header.get("Server"), Some("test"));
        assert_eq!(header.get("server"), Some("second"));
        assert_eq!(header.get("X-Time"), Some("12:30:01"));
        assert_eq!(header.len(), 3);
        assert_eq!(header.get("broken line"), None);
    }

    #[test]
    fn test_duplicate_header_last_wins() {
        let header = Header::parse(b"A: 1\r\nA: 2\r\n");
        assert_eq!(header.get("A"), Some("2"));
    }

    #[test]
    fn test_sizes_and_location() {
        let head = "HTTP/1.1 302 Found\r\nlocation: /next\r\n\r\n";
        let response = Response::from_exchange(raw(head, "moved", 5), request());
        assert_eq!(response.status(), 302);
        assert_eq!(response.location(), "/next");
        assert_eq!(response.content_length(), 5);
        assert_eq!(response.response_size(), head.len() + 5);
        assert_eq!(response.to_string(), format!("{head}moved"));
        assert_eq!(response.request().url.as_str(), "http://a.test/");
    }

    #[test]
    fn test_location_any_case() {
        let response = Response::from_exchange(
            raw("HTTP/1.1 301 Moved\r\nLOCATION: http://b.test/\r\n\r\n", "", 0),
            request(),
        );
        assert_eq!(response.location(), "http://b.test/");

        let response = Response::from_exchange(raw("HTTP/1.1 301 Moved\r\n\r\n", "", 0), request());
        assert_eq!(response.location(), "");
    }

    #[test]
    fn test_unknown_content_length_falls_back_to_body() {
        let response = Response::from_exchange(raw("HTTP/1.1 200 OK\r\n\r\n", "chunked!", -1), request());
        assert_eq!(response.content_length(), 8);
    }

    #[test]
    fn test_equality_ignores_history() {
        let response = Response::from_exchange(raw("HTTP/1.1 200 OK\r\n\r\n", "x", 1), request());
        let with_history = response.clone().with_history(vec![response.clone()]);
        assert_eq!(response, with_history);
        assert_eq!(with_history.response_history().len(), 1);
        assert!(response.response_history().is_empty());
    }
}
