//! Error type definitions.
//!
//! This module defines every error a caller can observe: configuration-time
//! failures, per-call failures raised before any network I/O, transport
//! failures passed through from the connection layer, and redirect-loop failures.

use log::SetLoggerError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Boxed error used as the opaque source of transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error building the rustls client configuration.
    #[error("TLS configuration error: {0}")]
    TlsConfigError(#[from] rustls::Error),
}

/// Every failure returned by the public API.
#[derive(Error, Debug)]
pub enum Error {
    /// A proxy URL could not be parsed.
    #[error("invalid proxy url: {url}")]
    InvalidProxyUrl {
        /// The rejected proxy URL
        url: String,
        /// Parser error
        source: url::ParseError,
    },

    /// A proxy endpoint was parsed but no dialer could be built for it.
    #[error("create proxy client failed: {0}")]
    ProxyInit(String),

    /// `do_request` was called with an empty URL.
    #[error("URL is empty")]
    EmptyUrl,

    /// No method was passed and none was set with `set_method`.
    #[error("method is empty")]
    EmptyMethod,

    /// The method is not a valid HTTP token.
    #[error("invalid method: {0:?}")]
    InvalidMethod(String),

    /// The request URL (or a redirect location) could not be parsed.
    #[error("parse URL {url} error: {source}")]
    UrlParse {
        /// The rejected URL
        url: String,
        /// Parser error
        source: url::ParseError,
    },

    /// The URL scheme is neither `http` nor `https`.
    #[error("unsupported scheme {scheme:?} in {url}")]
    UnsupportedScheme {
        /// The rejected URL
        url: String,
        /// Its scheme
        scheme: String,
    },

    /// A header name or value cannot be sent on the wire.
    #[error("invalid header {name:?}")]
    InvalidHeader {
        /// Name of the offending header
        name: String,
    },

    /// The transport failed (timeout, pool exhaustion, refused connection, oversized body).
    #[error("request {url} failed: {source}")]
    Transport {
        /// URL of the failed hop
        url: String,
        /// Transport failure, passed through unmodified
        source: TransportError,
    },

    /// The redirect chain grew past the configured maximum.
    #[error("too many redirects detected when doing the request (max {max})")]
    TooManyRedirects {
        /// Configured maximum
        max: usize,
    },

    /// A redirect response carried no `Location` header.
    #[error("missing Location header for {status} redirect from {url}")]
    MissingLocation {
        /// URL of the redirecting hop
        url: String,
        /// Redirect status code
        status: u16,
    },

    /// The caller's cancellation token fired.
    #[error("request cancelled")]
    Cancelled,
}

/// Discriminant of [`Error`], for matching without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
#[allow(missing_docs)]
pub enum ErrorKind {
    InvalidProxyUrl,
    ProxyInit,
    EmptyUrl,
    EmptyMethod,
    InvalidMethod,
    UrlParse,
    UnsupportedScheme,
    InvalidHeader,
    Transport,
    TooManyRedirects,
    MissingLocation,
    Cancelled,
}

impl Error {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidProxyUrl { .. } => ErrorKind::InvalidProxyUrl,
            Error::ProxyInit(_) => ErrorKind::ProxyInit,
            Error::EmptyUrl => ErrorKind::EmptyUrl,
            Error::EmptyMethod => ErrorKind::EmptyMethod,
            Error::InvalidMethod(_) => ErrorKind::InvalidMethod,
            Error::UrlParse { .. } => ErrorKind::UrlParse,
            Error::UnsupportedScheme { .. } => ErrorKind::UnsupportedScheme,
            Error::InvalidHeader { .. } => ErrorKind::InvalidHeader,
            Error::Transport { .. } => ErrorKind::Transport,
            Error::TooManyRedirects { .. } => ErrorKind::TooManyRedirects,
            Error::MissingLocation { .. } => ErrorKind::MissingLocation,
            Error::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Returns the transport failure behind a `Transport` error.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Error::Transport { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl ErrorKind {
    /// Human-readable name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidProxyUrl => "Invalid proxy URL",
            ErrorKind::ProxyInit => "Proxy initialization error",
            ErrorKind::EmptyUrl => "Empty URL",
            ErrorKind::EmptyMethod => "Empty method",
            ErrorKind::InvalidMethod => "Invalid method",
            ErrorKind::UrlParse => "URL parse error",
            ErrorKind::UnsupportedScheme => "Unsupported URL scheme",
            ErrorKind::InvalidHeader => "Invalid header",
            ErrorKind::Transport => "Transport error",
            ErrorKind::TooManyRedirects => "Too many redirects",
            ErrorKind::MissingLocation => "Missing Location header",
            ErrorKind::Cancelled => "Cancelled",
        }
    }

    /// Configuration-time kinds abort client setup rather than a single call.
    pub fn is_configuration(&self) -> bool {
        matches!(self, ErrorKind::InvalidProxyUrl | ErrorKind::ProxyInit)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categories of transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum TransportErrorKind {
    /// Read/write deadline exceeded
    Timeout,
    /// The per-host connection cap stayed exhausted for the whole wait timeout
    NoFreeConnections,
    /// Response body exceeded the configured maximum
    BodyTooLarge,
    /// Dialing (directly or through proxies) failed
    Connect,
    /// TLS setup failed
    Tls,
    /// Malformed request or response on the wire
    Protocol,
    /// Anything not recognized above
    Other,
}

impl TransportErrorKind {
    /// Human-readable name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::NoFreeConnections => "no free connections available to host",
            TransportErrorKind::BodyTooLarge => "body size exceeds the given limit",
            TransportErrorKind::Connect => "connect error",
            TransportErrorKind::Tls => "TLS error",
            TransportErrorKind::Protocol => "protocol error",
            TransportErrorKind::Other => "transport error",
        }
    }
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An opaque transport failure with its category.
#[derive(Error, Debug)]
#[error("{kind}: {source}")]
pub struct TransportError {
    kind: TransportErrorKind,
    source: BoxError,
}

impl TransportError {
    /// Creates an error of an explicit kind.
    pub fn new(kind: TransportErrorKind, source: impl Into<BoxError>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }

    /// Wraps an error from the connection layer, categorizing it from its source chain.
    pub fn from_source(source: impl Into<BoxError>) -> Self {
        let source = source.into();
        let kind = super::categorization::categorize_transport_error(source.as_ref());
        Self { kind, source }
    }

    /// Category of this failure.
    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// Returns true for read/write deadline failures.
    pub fn is_timeout(&self) -> bool {
        self.kind == TransportErrorKind::Timeout
    }
}

/// Raised by the connector when a host's connection slots stay taken for the
/// whole wait timeout.
#[derive(Error, Debug)]
#[error("no free connections available to host {host}")]
pub struct NoFreeConnections {
    /// `host:port` whose slots were exhausted
    pub host: String,
}
