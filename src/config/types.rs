//! Configuration types.
//!
//! `ClientConfig` holds every transport-tunable setting of a [`Client`](crate::Client).
//! It can be constructed programmatically and handed to `Client::from_config`, or
//! mutated in place through the client's setters.

use std::sync::Arc;
use std::time::Duration;

use strum_macros::{Display, EnumString};

use crate::config::constants::{
    DEFAULT_MAX_CONNS_PER_HOST, DEFAULT_MAX_CONN_WAIT_TIMEOUT, DEFAULT_MAX_IDLE_CONN_DURATION,
    DEFAULT_MAX_RESPONSE_BODY_SIZE, DEFAULT_READ_BUFFER_SIZE, DEFAULT_READ_TIMEOUT,
    DEFAULT_WRITE_BUFFER_SIZE, DEFAULT_WRITE_TIMEOUT,
};
use crate::dial::{self, DialFn};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    #[default]
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Server certificate policy for `https` targets and `https` proxies.
#[derive(Clone, Debug, Default)]
pub enum TlsPolicy {
    /// Accept any server certificate. Matches the engine's scanning-oriented default.
    #[default]
    InsecureSkipVerify,
    /// Verify server certificates against the bundled web PKI roots.
    Verified,
    /// Use a caller-built rustls configuration as is.
    Custom(Arc<rustls::ClientConfig>),
}

/// Transport configuration owned by a `Client`.
///
/// Setters on `Client` accept any value; nothing here is validated until the
/// transport applies it (buffer sizes below the codec floor are raised, zero
/// limits mean "unlimited").
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Maximum duration for reading a full response, body included.
    /// One exchange gets `read_timeout + write_timeout`; both zero means no deadline.
    pub read_timeout: Duration,
    /// Maximum duration for writing a full request, body included
    pub write_timeout: Duration,
    /// Idle keep-alive connections are closed after this long
    pub max_idle_conn_duration: Duration,
    /// How long to wait for a free connection once `max_conns_per_host` is reached
    pub max_conn_wait_timeout: Duration,
    /// Per-connection read buffer size
    pub read_buffer_size: usize,
    /// Per-connection write buffer size
    pub write_buffer_size: usize,
    /// Maximum response body size in bytes (0 = unlimited)
    pub max_response_body_size: usize,
    /// Maximum concurrent connections per host (0 = unlimited)
    pub max_conns_per_host: usize,
    /// Do not send a default User-Agent when the request sets none
    pub no_default_user_agent_header: bool,
    /// Send header names as stored instead of in canonical `Title-Case`
    pub disable_header_names_normalizing: bool,
    /// Send the URL path exactly as written instead of normalizing it
    pub disable_path_normalizing: bool,
    /// Server certificate policy
    pub tls: TlsPolicy,
    /// Opens new connections to a target address
    pub dial: DialFn,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            max_idle_conn_duration: DEFAULT_MAX_IDLE_CONN_DURATION,
            max_conn_wait_timeout: DEFAULT_MAX_CONN_WAIT_TIMEOUT,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            max_response_body_size: DEFAULT_MAX_RESPONSE_BODY_SIZE,
            max_conns_per_host: DEFAULT_MAX_CONNS_PER_HOST,
            no_default_user_agent_header: true,
            disable_header_names_normalizing: true,
            disable_path_normalizing: true,
            tls: TlsPolicy::default(),
            dial: dial::tcp(),
        }
    }
}
