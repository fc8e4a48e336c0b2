//! Fetches a URL and prints the response, optionally following redirects.
//!
//! ```bash
//! cargo run --example simple -- http://example.com --follow --history
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use httpx::initialization::init_logger_with;
use httpx::{Client, LogFormat, LogLevel};

#[derive(Debug, Parser)]
#[command(name = "simple", about = "Fetch a URL with httpx")]
struct Opt {
    /// URL to fetch
    url: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Extra header, `Name: value` (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Request body
    #[arg(short, long)]
    data: Option<String>,

    /// Follow redirects
    #[arg(short = 'L', long)]
    follow: bool,

    /// Print every response of the redirect chain
    #[arg(long)]
    history: bool,

    /// Maximum number of redirects to follow
    #[arg(long, default_value_t = 5)]
    max_redirects: usize,

    /// Read and write timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Print the response body
    #[arg(short, long)]
    body: bool,

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
    client
        .set_read_timeout(Duration::from_secs(opt.timeout))
        .set_write_timeout(Duration::from_secs(opt.timeout));

    let request = client.r();
    for header in &opt.headers {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("Malformed header {header:?}"))?;
        request.set_header(name.trim(), value.trim());
    }
    if let Some(data) = &opt.data {
        request.set_body_string(data.clone());
    }
    if opt.follow {
        request
            .allow_redirect()
            .set_max_redirects_count(opt.max_redirects);
    }
    if opt.history {
        request.allow_save_response_history();
    }

    let response = request
        .do_request(&opt.url, &opt.method)
        .await
        .with_context(|| format!("{} {} failed", opt.method, opt.url))?;

    for (i, hop) in response.response_history().iter().enumerate() {
        println!("#{i} {} {} {}", hop.status(), hop.request().url, hop.location());
    }
    print!("{}", response.header_string());
    if let Some(content_type) = response.header().get_ignore_case("Content-Type") {
        println!("content type: {content_type}");
    }
    if opt.body {
        println!("{}", response.body_string());
    }
    println!("{} bytes", response.response_size());
    Ok(())
}
