// Apache-style access logging
//
// When enabled, the dispatcher wraps the response writer in a logger that
// observes the committed status and body size, then emits one line per
// request:
//
//   host - [02/Jan/2026:15:04:05 +0000] METHOD URI PROTO status bytes duration_ns

use crate::response::ResponseWrite;
use bytes::Bytes;
use chrono::{DateTime, Local, TimeZone};
use http::header::{HeaderName, HeaderValue};
use http::{Method, Response, StatusCode, Version};
use http_body_util::Full;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Destination for access-log lines. Lines go to stderr when no sink is
/// configured.
pub type LogSink = Arc<Mutex<dyn Write + Send>>;

/// Per-view access-log switches.
#[derive(Clone)]
pub(crate) struct AccessLogConfig {
    pub(crate) enabled: bool,
    pub(crate) sink: Option<LogSink>,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        // Logging is on out of the box; sink None means stderr.
        Self {
            enabled: true,
            sink: None,
        }
    }
}

/// Transparent [`ResponseWrite`] decorator recording the status and byte
/// count that actually went out.
///
/// The recorded status stays `0` when the handler never touched the
/// response, even though the wire response defaults to `200 OK`.
pub struct ResponseLogger<W> {
    inner: W,
    status: u16,
    size: u64,
}

impl<W: ResponseWrite> ResponseLogger<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            status: 0,
            size: 0,
        }
    }

    /// Last status passed to `write_head`, or 200 after a bare body write,
    /// or 0 if the response was never touched.
    pub fn recorded_status(&self) -> u16 {
        self.status
    }

    /// Total body bytes accepted by the underlying writer.
    pub fn bytes_written(&self) -> u64 {
        self.size
    }
}

impl<W: ResponseWrite> ResponseWrite for ResponseLogger<W> {
    fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.inner.insert_header(name, value);
    }

    fn write_head(&mut self, status: StatusCode) {
        self.inner.write_head(status);
        // Record every call: the log reflects the last attempt even though
        // the underlying writer keeps the first committed status.
        self.status = status.as_u16();
    }

    fn write(&mut self, chunk: &[u8]) -> usize {
        if self.status == 0 {
            self.status = StatusCode::OK.as_u16();
        }
        let accepted = self.inner.write(chunk);
        self.size += accepted as u64;
        accepted
    }

    fn status(&self) -> Option<StatusCode> {
        self.inner.status()
    }

    fn take_response(&mut self) -> Response<Full<Bytes>> {
        self.inner.take_response()
    }
}

/// Format one access-log entry. `hostport` is the raw `Host` value; the
/// port is stripped, and a host without a port logs as empty.
#[allow(clippy::too_many_arguments)]
pub(crate) fn format_entry<Tz: TimeZone>(
    time: DateTime<Tz>,
    hostport: &str,
    method: &Method,
    uri: &str,
    version: Version,
    status: u16,
    size: u64,
    elapsed: Duration,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let host = split_host_port(hostport).map(|(host, _)| host).unwrap_or("");
    format!(
        "{} - [{}] {} {} {} {} {} {}\n",
        host,
        time.format("%d/%b/%Y:%H:%M:%S %z"),
        method,
        uri,
        proto(version),
        status,
        size,
        elapsed.as_nanos(),
    )
}

/// Emit one entry for a finished request to the sink, or stderr when no
/// sink is configured.
#[allow(clippy::too_many_arguments)]
pub(crate) fn write_entry(
    sink: Option<&LogSink>,
    hostport: &str,
    method: &Method,
    uri: &str,
    version: Version,
    status: u16,
    size: u64,
    elapsed: Duration,
) {
    let line = format_entry(Local::now(), hostport, method, uri, version, status, size, elapsed);
    match sink {
        Some(sink) => {
            let _ = sink.lock().unwrap().write_all(line.as_bytes());
        }
        None => {
            let _ = io::stderr().write_all(line.as_bytes());
        }
    }
}

/// Split a `host:port` pair. The port is required and an IPv6 host must be
/// bracketed; anything else yields `None`.
pub(crate) fn split_host_port(hostport: &str) -> Option<(&str, &str)> {
    if let Some(rest) = hostport.strip_prefix('[') {
        let (host, rest) = rest.split_once(']')?;
        let port = rest.strip_prefix(':')?;
        if port.contains(':') {
            return None;
        }
        Some((host, port))
    } else {
        let (host, port) = hostport.rsplit_once(':')?;
        if host.contains(':') {
            // Unbracketed IPv6 is ambiguous.
            return None;
        }
        Some((host, port))
    }
}

fn proto(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/?",
    }
}
