//! Per-request context
//!
//! Every handler and middleware step receives a `Context`: the buffered
//! request, the captured route parameters, the application background, and
//! the response writer. Clones are cheap and share the same request state,
//! so the chain hands the same context to each step in turn.

use crate::app::ViewState;
use crate::background::Background;
use crate::error::Error;
use crate::response::{ResponseSink, SharedResponse};
use crate::router::RouteParams;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue, LOCATION};
use http::request::Parts;
use http::{HeaderMap, Method, StatusCode, Uri, Version};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    head: Parts,
    body: Bytes,
    params: RouteParams,
    background: Background,
    state: Arc<ViewState>,
    writer: SharedResponse,
}

impl Context {
    pub(crate) fn new(
        head: Parts,
        body: Bytes,
        params: RouteParams,
        background: Background,
        state: Arc<ViewState>,
        writer: SharedResponse,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                head,
                body,
                params,
                background,
                state,
                writer,
            }),
        }
    }

    /// Request method.
    pub fn method(&self) -> &Method {
        &self.inner.head.method
    }

    /// Request URI.
    pub fn uri(&self) -> &Uri {
        &self.inner.head.uri
    }

    /// Request path.
    pub fn path(&self) -> &str {
        self.inner.head.uri.path()
    }

    /// HTTP version of the request.
    pub fn version(&self) -> Version {
        self.inner.head.version
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.inner.head.headers
    }

    /// A request header by name; the empty string when the header is absent
    /// or not valid UTF-8.
    pub fn header(&self, name: &str) -> &str {
        self.inner
            .head
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
    }

    /// Buffered request body.
    pub fn body(&self) -> &Bytes {
        &self.inner.body
    }

    /// Named path parameter captured by the route, so for a route
    /// `/users/:id` the request `/users/42` yields `param("id") == "42"`.
    ///
    /// An unbound name yields the empty string; absent and empty are not
    /// distinguished.
    pub fn param(&self, name: &str) -> &str {
        self.inner.params.get(name).unwrap_or("")
    }

    /// First query-string value for `name`; empty when absent.
    pub fn query(&self, name: &str) -> String {
        self.inner
            .head
            .uri
            .query()
            .and_then(|query| first_value(query.as_bytes(), name))
            .unwrap_or_default()
    }

    /// Form value by name: urlencoded body fields first, query second,
    /// empty when neither carries it.
    ///
    /// The body is only consulted for POST, PUT, and PATCH requests carrying
    /// an `application/x-www-form-urlencoded` content type.
    pub fn form(&self, name: &str) -> String {
        if self.has_urlencoded_body() {
            if let Some(value) = first_value(&self.inner.body, name) {
                return value;
            }
        }
        self.query(name)
    }

    fn has_urlencoded_body(&self) -> bool {
        if !matches!(
            self.inner.head.method,
            Method::POST | Method::PUT | Method::PATCH
        ) {
            return false;
        }
        self.header("content-type")
            .starts_with("application/x-www-form-urlencoded")
    }

    /// Decode the request body as JSON.
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_json::from_slice(&self.inner.body)?)
    }

    /// Background bound to the view that owns the matched route.
    pub fn background(&self) -> &Background {
        &self.inner.background
    }

    pub(crate) fn writer(&self) -> &SharedResponse {
        &self.inner.writer
    }

    /// Set a response header. No effect once the status line is committed;
    /// invalid names or values are dropped with a warning.
    pub fn set_header(&self, name: &str, value: &str) {
        let Ok(header_name) = HeaderName::try_from(name) else {
            warn!("invalid response header name: {name}");
            return;
        };
        let Ok(header_value) = HeaderValue::try_from(value) else {
            warn!("invalid response header value for {name}");
            return;
        };
        self.inner
            .writer
            .lock()
            .unwrap()
            .insert_header(header_name, header_value);
    }

    /// Commit the response status. Only the first commit wins.
    pub fn write_head(&self, status: u16) {
        match StatusCode::from_u16(status) {
            Ok(code) => self.inner.writer.lock().unwrap().write_head(code),
            Err(_) => warn!("invalid status code {status} ignored"),
        }
    }

    /// Append bytes to the response body, committing `200 OK` first when no
    /// status was written yet. Returns the number of bytes accepted.
    pub fn write(&self, chunk: &[u8]) -> usize {
        self.inner.writer.lock().unwrap().write(chunk)
    }

    /// Write `text` as a `text/plain` response with the given status.
    pub fn text(&self, status: u16, text: &str) -> Result<(), Error> {
        let status = valid_status(status)?;
        let mut writer = self.inner.writer.lock().unwrap();
        writer.insert_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        writer.write_head(status);
        writer.write(text.as_bytes());
        Ok(())
    }

    /// Serialize `value` as the JSON response body with the given status.
    /// A trailing newline terminates the body.
    ///
    /// The status line is committed before serialization runs, so a failing
    /// serialization cannot change the status; the error still reaches the
    /// error handler.
    pub fn json<T: Serialize>(&self, status: u16, value: &T) -> Result<(), Error> {
        let status = valid_status(status)?;
        let mut writer = self.inner.writer.lock().unwrap();
        writer.insert_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        writer.write_head(status);
        let body = serde_json::to_vec(value)?;
        writer.write(&body);
        writer.write(b"\n");
        Ok(())
    }

    /// Redirect to `url`. `status` must lie in `300..=307`.
    ///
    /// GET requests also receive a small HTML body linking the target;
    /// other methods get headers only.
    pub fn redirect(&self, url: &str, status: u16) -> Result<(), Error> {
        if !(300..=307).contains(&status) {
            return Err(Error::InvalidRedirectCode(status));
        }
        let code = StatusCode::from_u16(status).map_err(|_| Error::InvalidRedirectCode(status))?;
        let location = HeaderValue::try_from(url)
            .map_err(|_| Error::msg(format!("invalid redirect url: {url}")))?;

        let is_get = self.inner.head.method == Method::GET;
        let mut writer = self.inner.writer.lock().unwrap();
        writer.insert_header(LOCATION, location);
        if is_get {
            writer.insert_header(
                CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            );
        }
        writer.write_head(code);
        if is_get {
            let body = format!(
                "<a href=\"{}\">{}</a>.\n",
                html_escape(url),
                code.canonical_reason().unwrap_or(""),
            );
            writer.write(body.as_bytes());
        }
        Ok(())
    }

    /// Render the named template through the configured engine, streaming
    /// straight into the response.
    ///
    /// Fails with [`Error::NoTemplateEngine`] when no engine is installed.
    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<(), Error> {
        let Some(engine) = self.inner.state.renderer() else {
            return Err(Error::NoTemplateEngine);
        };
        let data = serde_json::to_value(data)?;
        let mut out = ResponseSink::new(&self.inner.writer);
        engine.render(&mut out, name, &data)
    }
}

fn valid_status(status: u16) -> Result<StatusCode, Error> {
    StatusCode::from_u16(status).map_err(|_| Error::msg(format!("invalid status code {status}")))
}

fn first_value(raw: &[u8], name: &str) -> Option<String> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(raw).ok()?;
    pairs
        .into_iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
}

/// Escape the five HTML-significant characters, matching what browsers
/// expect inside an attribute value.
fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&#39;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            _ => out.push(c),
        }
    }
    out
}
