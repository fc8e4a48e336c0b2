// Shared mock servers for the integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::Path,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Redirect},
    routing::{any, get},
    Router,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Echoes the request line, the headers and the body back as plain text.
async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> String {
    let mut out = format!("{method} {uri}\n");
    for (name, value) in &headers {
        out.push_str(&format!("{}: {}\n", name, value.to_str().unwrap_or("?")));
    }
    out.push('\n');
    out.push_str(&String::from_utf8_lossy(&body));
    out
}

/// Starts the mock origin server and returns its base URL.
///
/// Routes:
/// - `/echo` echoes the request
/// - `/chain/{n}` redirects to `/chain/{n-1}` with 302 until `n` is 0
/// - `/status/{code}` redirects to `/echo` with the given status
/// - `/no-location` answers 302 without a `Location` header
/// - `/slow` answers after 500ms
#[allow(dead_code)]
pub async fn start_origin() -> String {
    let app = Router::new()
        .route("/echo", any(echo))
        .route(
            "/chain/{n}",
            get(|Path(n): Path<usize>| async move {
                if n == 0 {
                    "done".into_response()
                } else {
                    (StatusCode::FOUND, [(header::LOCATION, format!("/chain/{}", n - 1))])
                        .into_response()
                }
            }),
        )
        .route(
            "/status/{code}",
            any(|Path(code): Path<u16>| async move {
                match code {
                    301 => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, "/echo")]).into_response(),
                    303 => Redirect::to("/echo").into_response(),
                    307 => Redirect::temporary("/echo").into_response(),
                    308 => Redirect::permanent("/echo").into_response(),
                    _ => (StatusCode::FOUND, [(header::LOCATION, "/echo")]).into_response(),
                }
            }),
        )
        .route("/no-location", get(|| async { StatusCode::FOUND }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                "slow"
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind origin listener");
    let addr = listener.local_addr().expect("Failed to get origin address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Origin server failed");
    });
    format!("http://{addr}")
}

/// Starts a minimal HTTP CONNECT proxy that records the target of every tunnel.
#[allow(dead_code)]
pub async fn start_connect_proxy() -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind proxy listener");
    let addr = listener.local_addr().expect("Failed to get proxy address");
    let seen = Arc::new(Mutex::new(Vec::new()));

    let log = Arc::clone(&seen);
    tokio::spawn(async move {
        while let Ok((client, _)) = listener.accept().await {
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                let _ = tunnel(client, log).await;
            });
        }
    });
    (addr, seen)
}

async fn tunnel(mut client: TcpStream, log: Arc<Mutex<Vec<String>>>) -> std::io::Result<()> {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if client.read(&mut byte).await? == 0 {
            return Ok(());
        }
        head.push(byte[0]);
    }

    let head = String::from_utf8_lossy(&head).into_owned();
    let mut parts = head.split_whitespace();
    let (Some("CONNECT"), Some(target)) = (parts.next(), parts.next()) else {
        client.write_all(b"HTTP/1.1 405 Method Not Allowed\r\n\r\n").await?;
        return Ok(());
    };
    log.lock().expect("proxy log poisoned").push(target.to_string());

    let mut upstream = match TcpStream::connect(target).await {
        Ok(upstream) => upstream,
        Err(_) => {
            client.write_all(b"HTTP/1.1 502 Bad Gateway\r\n\r\n").await?;
            return Ok(());
        }
    };
    client
        .write_all(b"HTTP/1.1 200 Connection established\r\n\r\n")
        .await?;
    tokio::io::copy_bidirectional(&mut client, &mut upstream).await?;
    Ok(())
}
