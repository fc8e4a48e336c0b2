//! Error handling.
//!
//! This module provides:
//! - The public `Error` type and its `ErrorKind` discriminant
//! - Transport error categories and the chain walker that assigns them
//! - Initialization errors (logger, TLS)
//!
//! Errors are grouped into:
//! - **Configuration errors**: bad proxy URLs, proxy dialers that cannot be built
//! - **Request errors**: empty URL or method, unparsable URLs, invalid headers
//! - **Transport errors**: passed through from the connection layer unmodified
//! - **Redirect errors**: too many hops, a redirect without `Location`

mod categorization;
mod types;

// Re-export public API
pub use categorization::categorize_transport_error;
pub use types::{
    BoxError, Error, ErrorKind, InitializationError, NoFreeConnections, TransportError,
    TransportErrorKind,
};
