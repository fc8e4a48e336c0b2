//! Fetches a URL through a chain of proxies.
//!
//! ```bash
//! cargo run --example proxies -- http://example.com \
//!     --proxy http://127.0.0.1:8080 --proxy socks5h://127.0.0.1:1080
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use httpx::initialization::init_logger_with;
use httpx::{Client, LogFormat, LogLevel, TlsPolicy};
use log::info;

#[derive(Debug, Parser)]
#[command(name = "proxies", about = "Fetch a URL through a proxy chain")]
struct Opt {
    /// URL to fetch
    url: String,

    /// Proxy URL, outermost first (repeatable)
    #[arg(short, long = "proxy")]
    proxies: Vec<String>,

    /// Verify server certificates against the webpki roots
    #[arg(long)]
    verify: bool,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, default_value = "info")]
    log_level: LogLevel,

    /// Log format: plain or json
    #[arg(long, default_value = "plain")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();
    init_logger_with(opt.log_level.into(), opt.log_format).context("Failed to initialize logger")?;

    let client = Client::new();
    if opt.verify {
        client.set_tls_policy(TlsPolicy::Verified);
    }
    client
        .set_proxies(&opt.proxies)
        .context("Invalid proxy configuration")?;
    info!("Dialing through {} proxy hop(s)", opt.proxies.len());

    let response = client
        .r()
        .allow_redirect()
        .get(&opt.url)
        .await
        .with_context(|| format!("GET {} failed", opt.url))?;

    println!("{} {}", response.status(), response.request().url);
    println!("{} bytes", response.response_size());
    Ok(())
}
