//! Minimal HTTP/1.1 dashboard endpoint.
//!
//! Responsibilities:
//! - `GET /api/stats` — JSON snapshot of accepted/refused counters and
//!   per-station load, assembled under the shared production-manager
//!   lock.
//! - `GET /<path>` — serve a file from the configured web asset
//!   directory; 404 on miss.
//!
//! Non-responsibilities:
//! - Concurrent connection handling: requests are serialized (accept,
//!   read, respond, close).

use std::path::{Path, PathBuf};

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use crate::stats::SharedContext;
use crate::time;

/// Accepts connections until cancellation. Never exits on a single
/// connection's I/O error; it logs and keeps accepting, since the
/// dashboard is a daemon for the process lifetime: a socket I/O failure
/// closes the offending connection and the accept loop continues.
pub async fn serve(listener: TcpListener, web_asset_dir: PathBuf, ctx: SharedContext) {
    info!(addr = ?listener.local_addr().ok(), "dashboard listening");
    loop {
        let (stream, _addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "dashboard accept failed");
                continue;
            }
        };

        if let Err(e) = handle_connection(stream, &web_asset_dir, &ctx).await {
            warn!(error = %e, "dashboard connection failed");
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    web_asset_dir: &Path,
    ctx: &SharedContext,
) -> anyhow::Result<()> {
    let mut buf = [0u8; 1024];
    let n = stream.read(&mut buf).await?;
    if n == 0 {
        return Ok(());
    }

    let request = String::from_utf8_lossy(&buf[..n]);
    let first_line = request.lines().next().unwrap_or("");
    let path = first_line
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string();

    let (status, content_type, body) = if path == "/api/stats" {
        let now = time::now();
        let snapshot = ctx.stats.snapshot();
        let stations = ctx.production.snapshot(now);
        let body = json!({
            "stats": {
                "accepted": snapshot.accepted,
                "refused": snapshot.refused,
            },
            "stations": stations.iter().map(|s| json!({
                "id": s.id,
                "available": s.available,
                "max_capacity": s.max_capacity,
                "current_load": s.current_load,
                "size": s.size.as_wire_str(),
                "restrictions": s.restrictions,
            })).collect::<Vec<_>>(),
        });
        (200u16, "application/json", body.to_string().into_bytes())
    } else {
        let rel = if path == "/" { "index.html" } else { path.trim_start_matches('/') };
        let file_path = web_asset_dir.join(rel);
        match tokio::fs::read(&file_path).await {
            Ok(bytes) => (200u16, content_type_for(&file_path), bytes),
            Err(_) => (404u16, "text/plain", b"not found".to_vec()),
        }
    };

    let status_line = match status {
        200 => "200 OK",
        404 => "404 Not Found",
        _ => "500 Internal Server Error",
    };

    let header = format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nAccess-Control-Allow-Origin: *\r\n\r\n",
        body.len()
    );

    stream.write_all(header.as_bytes()).await?;
    stream.write_all(&body).await?;
    Ok(())
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        _ => "text/html",
    }
}
