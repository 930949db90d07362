//! Helpers for testing HTTP-backed providers and IP sources
//!
//! Enabled for this crate's tests and for dependents through the `testing`
//! feature.

use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serve exactly one canned HTTP response on a loopback port
///
/// Returns the base URL (`http://127.0.0.1:<port>`, no trailing slash) and a
/// handle yielding the raw request once it has been read in full, body
/// included.
pub async fn serve_once(
    status: u16,
    content_type: &'static str,
    body: impl Into<String>,
) -> io::Result<(String, JoinHandle<io::Result<String>>)> {
    let body = body.into();
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await?;
        let request = read_request(&mut socket).await?;

        let response = format!(
            "HTTP/1.1 {} X\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            content_type,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await?;
        socket.shutdown().await?;
        Ok(request)
    });

    Ok((format!("http://{}", addr), handle))
}

/// Read headers plus `Content-Length` bytes of body
async fn read_request(socket: &mut tokio::net::TcpStream) -> io::Result<String> {
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];

    loop {
        let n = socket.read(&mut buf).await?;
        request.extend_from_slice(&buf[..n]);

        if let Some(header_end) = find_header_end(&request) {
            let complete = header_end + 4 + content_length(&request[..header_end]);
            if request.len() >= complete {
                break;
            }
        }
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before the request was complete",
            ));
        }
    }

    Ok(String::from_utf8_lossy(&request).into_owned())
}

fn find_header_end(request: &[u8]) -> Option<usize> {
    request.windows(4).position(|w| w == b"\r\n\r\n")
}

fn content_length(headers: &[u8]) -> usize {
    String::from_utf8_lossy(headers)
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse().ok())?
        })
        .unwrap_or(0)
}
