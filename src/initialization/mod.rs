//! Process-level initialization.
//!
//! This module provides functions to set up shared resources:
//! - Logger (plain or JSON output through `env_logger`)
//! - rustls client configuration for a `TlsPolicy`
//!
//! All initialization functions return `InitializationError` on failure.

mod logger;
mod tls;

// Re-export public API
pub use logger::init_logger_with;
pub use tls::init_tls_config;
