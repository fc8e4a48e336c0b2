//! Client configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, buffer sizes, redirect limits)
//! - Method, header name and header value constants
//! - The `ClientConfig` type and its TLS and logging companions

mod constants;
mod headers;
mod types;

// Re-export all constants
pub use constants::*;
pub use headers::*;
pub use types::{ClientConfig, LogFormat, LogLevel, TlsPolicy};
