//! Configuration constants.
//!
//! Defaults for every client setting, plus the redirect and buffer limits the
//! request engine relies on.

use std::time::Duration;

// Timeouts (used as defaults)
/// Maximum duration for reading a full response, body included.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum duration for writing a full request, body included.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);
/// How long an idle keep-alive connection stays in the pool.
pub const DEFAULT_MAX_IDLE_CONN_DURATION: Duration = Duration::from_secs(10);
/// How long a request waits for a free connection slot once the per-host cap is reached.
pub const DEFAULT_MAX_CONN_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

// Buffer and size limits
/// Per-connection read buffer (4MB, suits large downloads and JSON documents)
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4 * 1024 * 1024;
/// Per-connection write buffer (1MB, suits large uploads)
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 1024 * 1024;
/// Maximum response body size in bytes (10MB)
/// Bodies larger than this fail the exchange instead of being buffered.
/// Zero disables the limit.
pub const DEFAULT_MAX_RESPONSE_BODY_SIZE: usize = 10 * 1024 * 1024;
/// Smallest read buffer the HTTP/1 codec accepts.
pub const MIN_READ_BUFFER_SIZE: usize = 8192;

// Connection limits
/// Maximum concurrent connections per target host. Zero disables the cap.
pub const DEFAULT_MAX_CONNS_PER_HOST: usize = 1024;

// Redirect handling
/// Maximum number of redirect hops a request follows by default
pub const DEFAULT_MAX_REDIRECTS_COUNT: usize = 5;
/// Status codes treated as redirects.
pub const REDIRECT_STATUS_CODES: [u16; 5] = [301, 302, 303, 307, 308];

// Proxy default ports, used when the proxy URL omits one
/// `http://` proxies
pub const HTTP_PROXY_DEFAULT_PORT: u16 = 80;
/// `https://` proxies
pub const HTTPS_PROXY_DEFAULT_PORT: u16 = 443;
/// `socks5://` and `socks5h://` proxies
pub const SOCKS5_PROXY_DEFAULT_PORT: u16 = 1080;

/// Returns true when `status` belongs to the redirect family.
pub fn is_redirect_status(status: u16) -> bool {
    REDIRECT_STATUS_CODES.contains(&status)
}
