//! Request log in Apache combined format.
//!
//! The middleware formats one line per request and hands it to a background
//! task that appends to the log file, so request handling never waits on
//! log I/O. When the channel is full, lines are dropped with a warning.

use std::net::SocketAddr;
use std::path::Path;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, FixedOffset, Local};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::auth::request_user;
use crate::error::ServerResult;

const BACKLOG: usize = 1024;

/// Handle to the request log writer.
#[derive(Clone)]
pub struct AccessLog {
    tx: mpsc::Sender<String>,
}

impl AccessLog {
    /// Open `path` for appending and start the writer task.
    pub async fn open(path: &Path) -> ServerResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        let (tx, rx) = mpsc::channel(BACKLOG);
        tokio::spawn(write_lines(file, rx));
        Ok(Self { tx })
    }

    fn submit(&self, line: String) {
        if self.tx.try_send(line).is_err() {
            warn!("request log backlog full, dropping entry");
        }
    }
}

async fn write_lines(mut file: tokio::fs::File, mut rx: mpsc::Receiver<String>) {
    while let Some(line) = rx.recv().await {
        let written = match file.write_all(line.as_bytes()).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            error!(error = %e, "failed to write request log");
        }
    }
}

/// One request, as recorded in the log.
#[derive(Clone, Debug)]
pub struct LogEntry {
    pub remote: Option<SocketAddr>,
    pub user: String,
    pub time: DateTime<FixedOffset>,
    pub request_line: String,
    pub status: StatusCode,
    pub size: Option<u64>,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
}

fn or_dash(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => "-",
    }
}

/// Format an entry as a combined-log line, newline included.
pub fn format_combined(entry: &LogEntry) -> String {
    let host = entry
        .remote
        .map(|a| a.ip().to_string())
        .unwrap_or_else(|| "-".into());
    let size = entry
        .size
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".into());
    format!(
        "{host} - {} [{}] \"{}\" {} {size} \"{}\" \"{}\"\n",
        or_dash(Some(entry.user.as_str())),
        entry.time.format("%d/%b/%Y:%H:%M:%S %z"),
        entry.request_line,
        entry.status.as_u16(),
        or_dash(entry.referer.as_deref()),
        or_dash(entry.user_agent.as_deref()),
    )
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Axum middleware recording every request in the log.
pub async fn record(State(log): State<AccessLog>, req: Request, next: Next) -> Response {
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|c| c.0);
    let user = request_user(req.headers());
    let request_line = format!("{} {} {:?}", req.method(), req.uri(), req.version());
    let referer = header_string(req.headers(), header::REFERER);
    let user_agent = header_string(req.headers(), header::USER_AGENT);
    let time = Local::now().into();

    let response = next.run(req).await;

    let size = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());
    log.submit(format_combined(&LogEntry {
        remote,
        user,
        time,
        request_line,
        status: response.status(),
        size,
        referer,
        user_agent,
    }));
    response
}
