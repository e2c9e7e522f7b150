// Application views: route registration, middleware, dispatch
//
// An App is a view onto a shared route table: a path prefix plus the
// configuration (middleware, error handler, not-found handler, template
// engine, background, access log) applied to routes registered through it.
// Subrouters snapshot that configuration and evolve independently while
// feeding the same table.

use crate::access_log::{self, AccessLogConfig, LogSink, ResponseLogger};
use crate::background::Background;
use crate::context::Context;
use crate::error::Error;
use crate::handler::{
    ErrorHandler, ErrorHandlerFn, Handler, HandlerFn, default_error_handler, default_not_found,
};
use crate::render::Renderer;
use crate::response::{BufferedResponse, ResponseWrite, SharedResponse, plain_error};
use crate::router::{Mux, RouteEntry, RouteParams};
use crate::server;
use crate::static_files;
use crate::tls::TlsConfig;
use bytes::Bytes;
use http::header::HOST;
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;
use tracing::warn;

/// Mutable per-view configuration, shared by every route the view
/// registered.
///
/// Routes hold the view that registered them, so configuration changes
/// after registration still apply to requests hitting those routes.
pub(crate) struct ViewState {
    pub(crate) middleware: RwLock<Vec<HandlerFn>>,
    pub(crate) error_handler: RwLock<ErrorHandlerFn>,
    pub(crate) not_found: RwLock<HandlerFn>,
    pub(crate) renderer: RwLock<Option<Arc<dyn Renderer>>>,
    pub(crate) background: RwLock<Background>,
    pub(crate) access_log: RwLock<AccessLogConfig>,
}

impl ViewState {
    pub(crate) fn new() -> Self {
        Self {
            middleware: RwLock::new(Vec::new()),
            error_handler: RwLock::new(Arc::new(default_error_handler)),
            not_found: RwLock::new(Arc::new(default_not_found)),
            renderer: RwLock::new(None),
            background: RwLock::new(Background::new()),
            access_log: RwLock::new(AccessLogConfig::default()),
        }
    }

    /// Deep copy for a new subrouter view.
    fn snapshot(&self) -> Self {
        Self {
            middleware: RwLock::new(self.middleware.read().unwrap().clone()),
            error_handler: RwLock::new(self.error_handler.read().unwrap().clone()),
            not_found: RwLock::new(self.not_found.read().unwrap().clone()),
            renderer: RwLock::new(self.renderer.read().unwrap().clone()),
            background: RwLock::new(self.background.read().unwrap().clone()),
            access_log: RwLock::new(self.access_log.read().unwrap().clone()),
        }
    }

    pub(crate) fn middleware_chain(&self) -> Vec<HandlerFn> {
        self.middleware.read().unwrap().clone()
    }

    pub(crate) fn error_handler(&self) -> ErrorHandlerFn {
        self.error_handler.read().unwrap().clone()
    }

    pub(crate) fn not_found_handler(&self) -> HandlerFn {
        self.not_found.read().unwrap().clone()
    }

    pub(crate) fn renderer(&self) -> Option<Arc<dyn Renderer>> {
        self.renderer.read().unwrap().clone()
    }

    pub(crate) fn background(&self) -> Background {
        self.background.read().unwrap().clone()
    }

    fn log_config(&self) -> AccessLogConfig {
        self.access_log.read().unwrap().clone()
    }
}

/// An application view: a routing prefix plus the configuration applied to
/// every route registered through it.
///
/// [`App::new`] creates the root view. [`App::subrouter`] derives a child
/// view that shares the route table but copies the configuration, so parent
/// and child evolve independently after the split.
#[derive(Clone)]
pub struct App {
    mux: Arc<Mux>,
    view: Arc<ViewState>,
    prefix: String,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Create a root view with the default configuration: access log
    /// enabled to stderr, plain-text error and not-found handlers, a fresh
    /// background, and no template engine.
    pub fn new() -> Self {
        Self {
            mux: Arc::new(Mux::new()),
            view: Arc::new(ViewState::new()),
            prefix: String::new(),
        }
    }

    /// Register `handler` for GET requests at `path`, joined to the view
    /// prefix.
    pub fn get<H: Handler>(&self, path: &str, handler: H) {
        self.route(Method::GET, path, handler);
    }

    /// Register `handler` for POST requests at `path`.
    pub fn post<H: Handler>(&self, path: &str, handler: H) {
        self.route(Method::POST, path, handler);
    }

    /// Register `handler` for PUT requests at `path`.
    pub fn put<H: Handler>(&self, path: &str, handler: H) {
        self.route(Method::PUT, path, handler);
    }

    /// Register `handler` for DELETE requests at `path`.
    pub fn delete<H: Handler>(&self, path: &str, handler: H) {
        self.route(Method::DELETE, path, handler);
    }

    /// Register `handler` for `method` at `path`, joined to the view
    /// prefix. Panics on a conflicting or malformed pattern.
    pub fn route<H: Handler>(&self, method: Method, path: &str, handler: H) {
        let entry = RouteEntry {
            handler: Arc::new(handler),
            view: self.view.clone(),
        };
        self.mux
            .register(method, &join_paths(&self.prefix, path), entry);
    }

    /// Serve files from `dir` under `prefix`: `GET /prefix/sub/file.css`
    /// maps to `dir/sub/file.css`. Registered as an ordinary route, so the
    /// view's middleware and error handler apply to file requests too.
    pub fn static_dir(&self, prefix: &str, dir: impl Into<PathBuf>) {
        let route = join_paths(prefix, "*filepath");
        self.get(&route, static_files::serve_dir(dir.into()));
    }

    /// Append a middleware step to this view.
    ///
    /// Middleware runs in registration order before the terminal handler,
    /// for every route registered through this view, including routes that
    /// were added before this call.
    pub fn use_middleware<H: Handler>(&self, handler: H) -> &Self {
        self.view.middleware.write().unwrap().push(Arc::new(handler));
        self
    }

    /// Clear this view's middleware.
    pub fn reset_middleware(&self) -> &Self {
        self.view.middleware.write().unwrap().clear();
        self
    }

    /// Derive a child view with `prefix` appended.
    ///
    /// The child shares the route table but copies the middleware list and
    /// the rest of the configuration, so later changes on either side stay
    /// local to that side.
    pub fn subrouter(&self, prefix: &str) -> App {
        App {
            mux: self.mux.clone(),
            view: Arc::new(self.view.snapshot()),
            prefix: format!("{}{}", self.prefix, prefix),
        }
    }

    /// Replace the background carried by requests to this view's routes.
    /// Call once during startup, before serving.
    pub fn bind_background(&self, background: Background) {
        *self.view.background.write().unwrap() = background;
    }

    /// Background currently bound to this view.
    pub fn background(&self) -> Background {
        self.view.background()
    }

    /// Install a template engine for [`Context::render`].
    pub fn set_template_engine<R: Renderer + 'static>(&self, engine: R) {
        *self.view.renderer.write().unwrap() = Some(Arc::new(engine));
    }

    /// Replace the error handler invoked when a handler or middleware step
    /// fails.
    ///
    /// The default writes a plain-text 500 carrying the error message,
    /// which suits development; install a quieter handler for production.
    pub fn set_error_handler<H: ErrorHandler>(&self, handler: H) {
        *self.view.error_handler.write().unwrap() = Arc::new(handler);
    }

    /// Replace the handler invoked when no route matches.
    pub fn set_not_found<H: Handler>(&self, handler: H) {
        *self.view.not_found.write().unwrap() = Arc::new(handler);
    }

    /// Enable or disable the access log for requests dispatched through
    /// this view. Enabled by default.
    pub fn set_access_log(&self, enabled: bool) {
        self.view.access_log.write().unwrap().enabled = enabled;
    }

    /// Redirect access-log output. Defaults to stderr.
    pub fn set_log_output(&self, sink: LogSink) {
        self.view.access_log.write().unwrap().sink = Some(sink);
    }

    /// Handle one request end to end and return the response.
    ///
    /// This is the entire pipeline behind [`App::serve`]: routing, the
    /// middleware chain, the terminal handler, error handling, and the
    /// access log. It is also the natural entry point for tests.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: hyper::body::Body + Send,
        B::Data: Send,
        B::Error: std::fmt::Display,
    {
        let log = self.view.log_config();
        if !log.enabled {
            let writer = Arc::new(Mutex::new(BufferedResponse::new()));
            let shared: SharedResponse = writer.clone();
            self.run(req, shared).await;
            return writer.lock().unwrap().take_response();
        }

        let start = Instant::now();
        let method = req.method().clone();
        let uri = req.uri().to_string();
        let version = req.version();
        let hostport = req
            .headers()
            .get(HOST)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
            .or_else(|| req.uri().authority().map(|authority| authority.to_string()))
            .unwrap_or_default();

        let logger = Arc::new(Mutex::new(ResponseLogger::new(BufferedResponse::new())));
        let shared: SharedResponse = logger.clone();
        self.run(req, shared).await;

        let (status, size) = {
            let logger = logger.lock().unwrap();
            (logger.recorded_status(), logger.bytes_written())
        };
        access_log::write_entry(
            log.sink.as_ref(),
            &hostport,
            &method,
            &uri,
            version,
            status,
            size,
            start.elapsed(),
        );
        logger.lock().unwrap().take_response()
    }

    /// Buffer the request body, then dispatch.
    async fn run<B>(&self, req: Request<B>, writer: SharedResponse)
    where
        B: hyper::body::Body + Send,
        B::Data: Send,
        B::Error: std::fmt::Display,
    {
        let (parts, body) = req.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                warn!("failed to buffer request body: {err}");
                plain_error(
                    &mut *writer.lock().unwrap(),
                    StatusCode::BAD_REQUEST,
                    "bad request",
                );
                return;
            }
        };
        self.dispatch(parts, body, writer).await;
    }

    /// Route the request, run the middleware chain and the terminal
    /// handler, and on the first failure hand off to the error handler
    /// exactly once.
    async fn dispatch(&self, parts: http::request::Parts, body: Bytes, writer: SharedResponse) {
        match self.mux.lookup(&parts.method, parts.uri.path()) {
            Some((entry, params)) => {
                let view = entry.view.clone();
                let ctx = Context::new(
                    parts,
                    body,
                    params,
                    view.background(),
                    view.clone(),
                    writer,
                );
                for middleware in view.middleware_chain() {
                    if let Err(err) = middleware.call(ctx.clone()).await {
                        view.error_handler().call(ctx, err).await;
                        return;
                    }
                }
                if let Err(err) = entry.handler.call(ctx.clone()).await {
                    view.error_handler().call(ctx, err).await;
                }
            }
            None => {
                // No route: the serving view's not-found handler runs,
                // without middleware.
                let view = self.view.clone();
                let ctx = Context::new(
                    parts,
                    body,
                    RouteParams::default(),
                    view.background(),
                    view.clone(),
                    writer,
                );
                if let Err(err) = view.not_found_handler().call(ctx.clone()).await {
                    view.error_handler().call(ctx, err).await;
                }
            }
        }
    }

    /// Serve plain HTTP on `0.0.0.0:port` until the bound background is
    /// cancelled.
    pub async fn serve(&self, port: u16) -> Result<(), Error> {
        server::serve(self, port).await
    }

    /// Serve HTTPS on `0.0.0.0:port` with the given PEM certificate chain
    /// and private key, until the bound background is cancelled.
    pub async fn serve_tls(
        &self,
        port: u16,
        cert_path: impl AsRef<std::path::Path>,
        key_path: impl AsRef<std::path::Path>,
    ) -> Result<(), Error> {
        let tls = TlsConfig::from_pem_files(cert_path, key_path)?;
        server::serve_tls(self, port, tls).await
    }
}

/// Join a view prefix and a route path into a clean absolute path:
/// duplicate slashes collapse and a lone trailing slash is dropped.
pub(crate) fn join_paths(prefix: &str, path: &str) -> String {
    let combined = format!("{prefix}/{path}");
    let mut out = String::with_capacity(combined.len() + 1);
    out.push('/');
    for segment in combined.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if !out.ends_with('/') {
            out.push('/');
        }
        out.push_str(segment);
    }
    out
}
