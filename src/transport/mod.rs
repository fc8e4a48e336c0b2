//! Transport adapter.
//!
//! This module provides:
//! - The `Transport` trait the client publishes its configuration into
//! - `OutgoingRequest` and `RawResponse`, the wire-level values it exchanges
//! - `HyperTransport`, the default pooled implementation

mod connector;
mod message;
mod pooled;

use async_trait::async_trait;

use crate::config::ClientConfig;
use crate::error_handling::TransportError;

pub use message::{canonical_header_name, OutgoingRequest, RawResponse, WireOptions};
pub use pooled::HyperTransport;

pub(crate) use message::{host_header_value, request_target, set_header};

/// The byte-level HTTP engine a `Client` drives.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Applies a configuration. Called with the client mutex held, so
    /// implementations must not block on other clients' work.
    fn configure(&self, config: &ClientConfig) -> Result<(), TransportError>;

    /// Performs one request/response exchange. Redirects are never followed here.
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse, TransportError>;
}
