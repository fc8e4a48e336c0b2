//! Transport error categorization.
//!
//! Errors from the connection layer arrive as opaque boxed chains (hyper wraps
//! connector errors, connectors wrap `io::Error`, `io::Error` wraps markers).
//! This module walks such a chain and picks the most specific category.

use std::error::Error as StdError;
use std::io;

use super::types::{NoFreeConnections, TransportErrorKind};

/// Categorizes a transport failure into a `TransportErrorKind`.
///
/// The whole source chain is inspected. Specific causes (pool exhaustion, TLS,
/// timeouts, body limits) found anywhere in the chain win over the generic
/// "connect" flag hyper sets on the outermost error.
///
/// # Arguments
///
/// * `error` - The outermost error of the chain
///
/// # Returns
///
/// The category of the failure, `Other` when nothing in the chain is recognized.
pub fn categorize_transport_error(error: &(dyn StdError + 'static)) -> TransportErrorKind {
    let mut fallback = TransportErrorKind::Other;
    let mut current: Option<&(dyn StdError + 'static)> = Some(error);

    while let Some(err) = current {
        if let Some(kind) = categorize_single(err) {
            return kind;
        }

        if let Some(client_err) = err.downcast_ref::<hyper_util::client::legacy::Error>() {
            if client_err.is_connect() && fallback == TransportErrorKind::Other {
                fallback = TransportErrorKind::Connect;
            }
        } else if let Some(io_err) = err.downcast_ref::<io::Error>() {
            // io::Error::source() skips the wrapped error, so look at it directly
            if let Some(inner) = io_err.get_ref() {
                let inner: &(dyn StdError + 'static) = inner;
                if let Some(kind) = categorize_single(inner) {
                    return kind;
                }
            }
            if fallback == TransportErrorKind::Other {
                fallback = categorize_io_kind(io_err.kind());
            }
        }

        current = err.source();
    }

    fallback
}

fn categorize_single(err: &(dyn StdError + 'static)) -> Option<TransportErrorKind> {
    if err.is::<NoFreeConnections>() {
        return Some(TransportErrorKind::NoFreeConnections);
    }
    if err.is::<http_body_util::LengthLimitError>() {
        return Some(TransportErrorKind::BodyTooLarge);
    }
    if err.is::<tokio::time::error::Elapsed>() {
        return Some(TransportErrorKind::Timeout);
    }
    if err.is::<rustls::Error>() {
        return Some(TransportErrorKind::Tls);
    }
    if let Some(io_err) = err.downcast_ref::<io::Error>() {
        if io_err.kind() == io::ErrorKind::TimedOut {
            return Some(TransportErrorKind::Timeout);
        }
    }
    if let Some(hyper_err) = err.downcast_ref::<hyper::Error>() {
        if hyper_err.is_timeout() {
            return Some(TransportErrorKind::Timeout);
        }
        if hyper_err.is_parse() || hyper_err.is_parse_too_large() || hyper_err.is_incomplete_message()
        {
            return Some(TransportErrorKind::Protocol);
        }
    }
    None
}

fn categorize_io_kind(kind: io::ErrorKind) -> TransportErrorKind {
    match kind {
        io::ErrorKind::TimedOut => TransportErrorKind::Timeout,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::AddrNotAvailable
        | io::ErrorKind::NotFound => TransportErrorKind::Connect,
        io::ErrorKind::InvalidData => TransportErrorKind::Protocol,
        _ => TransportErrorKind::Other,
    }
}
