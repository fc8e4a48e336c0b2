//! httpx: an HTTP/1.1 request engine
//!
//! This library issues HTTP requests over pooled connections, optionally
//! through a chain of forward proxies (HTTP CONNECT, HTTPS, SOCKS5), and can
//! follow redirects while recording every intermediate response.
//!
//! # Example
//!
//! ```no_run
//! use httpx::Client;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new();
//! client.set_proxies(["http://127.0.0.1:8080", "socks5h://127.0.0.1:1080"])?;
//!
//! let response = client
//!     .r()
//!     .set_user_agent(httpx::config::CHROME_USER_AGENT)
//!     .set_query_param("q", "rust")
//!     .allow_redirect()
//!     .allow_save_response_history()
//!     .get("http://example.com/search")
//!     .await?;
//!
//! for hop in response.response_history() {
//!     println!("{} {}", hop.status(), hop.location());
//! }
//! println!("{} bytes", response.response_size());
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

#![warn(missing_docs)]

mod client;
pub mod config;
pub mod dial;
mod error_handling;
pub mod initialization;
pub mod proxy;
mod request;
mod response;
pub mod transport;

// Re-export public API
pub use client::Client;
pub use config::{ClientConfig, LogFormat, LogLevel, TlsPolicy};
pub use error_handling::{
    categorize_transport_error, BoxError, Error, ErrorKind, InitializationError,
    NoFreeConnections, TransportError, TransportErrorKind,
};
pub use request::{BasicAuth, Request};
pub use response::{Header, Response};
pub use tokio_util::sync::CancellationToken;
