// Buffered response writing
//
// Handlers write through the ResponseWrite trait instead of a concrete
// buffer so the access log can wrap the sink without handlers noticing.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Response, StatusCode, header};
use http_body_util::Full;
use std::mem;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Write side of an in-flight response.
///
/// The first `write_head` commits the status line and freezes the headers;
/// later calls are ignored. A body write before any `write_head` commits
/// `200 OK` implicitly.
pub trait ResponseWrite: Send + Sync {
    /// Insert a header. Ignored once the status line is committed.
    fn insert_header(&mut self, name: HeaderName, value: HeaderValue);

    /// Commit the status line. Only the first call wins.
    fn write_head(&mut self, status: StatusCode);

    /// Append a body chunk, committing `200 OK` first if nothing was
    /// committed yet. Returns the number of bytes accepted.
    fn write(&mut self, chunk: &[u8]) -> usize;

    /// Committed status, if any.
    fn status(&self) -> Option<StatusCode>;

    /// Materialize the buffered state into a response, draining the buffer.
    fn take_response(&mut self) -> Response<Full<Bytes>>;
}

/// Shared handle to the in-flight response writer.
pub(crate) type SharedResponse = Arc<Mutex<dyn ResponseWrite>>;

/// Plain in-memory [`ResponseWrite`] implementation.
#[derive(Debug, Default)]
pub struct BufferedResponse {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Body bytes buffered so far.
    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }

    /// Headers buffered so far.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl ResponseWrite for BufferedResponse {
    fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        if self.status.is_some() {
            return;
        }
        self.headers.insert(name, value);
    }

    fn write_head(&mut self, status: StatusCode) {
        if self.status.is_some() {
            warn!("superfluous write_head call ignored");
            return;
        }
        self.status = Some(status);
    }

    fn write(&mut self, chunk: &[u8]) -> usize {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(chunk);
        chunk.len()
    }

    fn status(&self) -> Option<StatusCode> {
        self.status
    }

    fn take_response(&mut self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(Bytes::from(mem::take(&mut self.body))));
        *response.status_mut() = self.status.take().unwrap_or(StatusCode::OK);
        *response.headers_mut() = mem::take(&mut self.headers);
        response
    }
}

/// Write a plain-text error in the standard shape: `text/plain`, nosniff,
/// message plus trailing newline.
pub(crate) fn plain_error(writer: &mut dyn ResponseWrite, status: StatusCode, message: &str) {
    writer.insert_header(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    writer.insert_header(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    writer.write_head(status);
    writer.write(message.as_bytes());
    writer.write(b"\n");
}

/// `io::Write` adapter over the shared writer, used to stream template
/// output straight into the response buffer.
pub(crate) struct ResponseSink<'a> {
    writer: &'a Mutex<dyn ResponseWrite>,
}

impl<'a> ResponseSink<'a> {
    pub(crate) fn new(writer: &'a SharedResponse) -> Self {
        Self {
            writer: writer.as_ref(),
        }
    }
}

impl std::io::Write for ResponseSink<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Ok(self.writer.lock().unwrap().write(buf))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt as _;

    #[test]
    fn test_write_commits_200_by_default() {
        let mut response = BufferedResponse::new();
        response.write(b"hello");
        assert_eq!(response.status(), Some(StatusCode::OK));
        assert_eq!(response.body_bytes(), b"hello");
    }

    #[test]
    fn test_first_write_head_wins() {
        let mut response = BufferedResponse::new();
        response.write_head(StatusCode::NOT_FOUND);
        response.write_head(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.status(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_headers_frozen_after_commit() {
        let mut response = BufferedResponse::new();
        response.insert_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        response.write_head(StatusCode::OK);
        response.insert_header(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
        response.insert_header(header::ETAG, HeaderValue::from_static("\"abc\""));
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain"
        );
        assert!(response.headers().get(header::ETAG).is_none());
    }

    #[tokio::test]
    async fn test_take_response_materializes_buffered_state() {
        let mut response = BufferedResponse::new();
        response.insert_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        response.write_head(StatusCode::CREATED);
        response.write(b"made");

        let out = response.take_response();
        assert_eq!(out.status(), StatusCode::CREATED);
        assert_eq!(out.headers().get(header::CONTENT_TYPE).unwrap(), "text/plain");
        let body = out.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"made");

        // The buffer is drained, a second take yields an empty 200.
        let empty = response.take_response();
        assert_eq!(empty.status(), StatusCode::OK);
    }

    #[test]
    fn test_untouched_response_defaults_to_200() {
        let mut response = BufferedResponse::new();
        assert_eq!(response.status(), None);
        let out = response.take_response();
        assert_eq!(out.status(), StatusCode::OK);
    }

    #[test]
    fn test_plain_error_shape() {
        let mut response = BufferedResponse::new();
        plain_error(&mut response, StatusCode::NOT_FOUND, "404 page not found");
        assert_eq!(response.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(
            response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
            "nosniff"
        );
        assert_eq!(response.body_bytes(), b"404 page not found\n");
    }

    #[test]
    fn test_response_sink_streams_into_writer() {
        use std::io::Write as _;
        let shared: SharedResponse = Arc::new(Mutex::new(BufferedResponse::new()));
        let mut sink = ResponseSink::new(&shared);
        sink.write_all(b"chunk one ").unwrap();
        sink.write_all(b"chunk two").unwrap();
        let writer = shared.lock().unwrap();
        assert_eq!(writer.status(), Some(StatusCode::OK));
    }
}
