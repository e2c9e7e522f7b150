// Handler traits and the built-in defaults
//
// Handlers and middleware share one shape: an async function taking the
// request Context and returning Result<(), Error>. Type erasure happens at
// registration so views can store any handler uniformly.

use crate::context::Context;
use crate::error::Error;
use crate::response::plain_error;
use http::StatusCode;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by type-erased handlers.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), Error>> + Send>>;

/// A request handler or middleware step.
///
/// Implemented for every `Fn(Context) -> Future<Output = Result<(), Error>>`,
/// so plain async functions and closures register directly:
///
/// ```ignore
/// app.get("/hello", |ctx: Context| async move { ctx.text(200, "hello") });
/// ```
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: Context) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    fn call(&self, ctx: Context) -> HandlerFuture {
        Box::pin(self(ctx))
    }
}

/// Type-erased shared handler.
pub type HandlerFn = Arc<dyn Handler>;

/// Receives the error a handler or middleware step returned.
///
/// Invoked at most once per request; the chain stops at the first failure.
pub trait ErrorHandler: Send + Sync + 'static {
    fn call(&self, ctx: Context, err: Error) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

impl<F, Fut> ErrorHandler for F
where
    F: Fn(Context, Error) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call(&self, ctx: Context, err: Error) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(self(ctx, err))
    }
}

/// Type-erased shared error handler.
pub type ErrorHandlerFn = Arc<dyn ErrorHandler>;

/// Default error handler: plain-text 500 carrying the error message.
///
/// Handy during development; production deployments usually install their
/// own handler to keep error details out of responses.
pub(crate) async fn default_error_handler(ctx: Context, err: Error) {
    plain_error(
        &mut *ctx.writer().lock().unwrap(),
        StatusCode::INTERNAL_SERVER_ERROR,
        &err.to_string(),
    );
}

/// Default not-found handler: plain-text 404.
pub(crate) async fn default_not_found(ctx: Context) -> Result<(), Error> {
    plain_error(
        &mut *ctx.writer().lock().unwrap(),
        StatusCode::NOT_FOUND,
        "404 page not found",
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ViewState;
    use crate::background::Background;
    use crate::response::{BufferedResponse, ResponseWrite as _, SharedResponse};
    use crate::router::RouteParams;
    use bytes::Bytes;
    use std::sync::Mutex;

    fn test_context() -> (Context, Arc<Mutex<BufferedResponse>>) {
        let request = http::Request::builder()
            .method(http::Method::GET)
            .uri("/test")
            .body(())
            .unwrap();
        let (parts, _) = request.into_parts();
        let writer = Arc::new(Mutex::new(BufferedResponse::new()));
        let shared: SharedResponse = writer.clone();
        let ctx = Context::new(
            parts,
            Bytes::new(),
            RouteParams::default(),
            Background::new(),
            Arc::new(ViewState::new()),
            shared,
        );
        (ctx, writer)
    }

    #[tokio::test]
    async fn test_closure_implements_handler() {
        let handler: HandlerFn = Arc::new(|ctx: Context| async move { ctx.text(200, "ok") });
        let (ctx, writer) = test_context();
        handler.call(ctx).await.unwrap();
        let writer = writer.lock().unwrap();
        assert_eq!(writer.status(), Some(StatusCode::OK));
        assert_eq!(writer.body_bytes(), b"ok");
    }

    #[tokio::test]
    async fn test_closure_implements_error_handler() {
        let seen = Arc::new(Mutex::new(String::new()));
        let handler: ErrorHandlerFn = Arc::new({
            let seen = seen.clone();
            move |_ctx: Context, err: Error| {
                let seen = seen.clone();
                async move {
                    *seen.lock().unwrap() = err.to_string();
                }
            }
        });
        let (ctx, _) = test_context();
        handler.call(ctx, Error::msg("boom")).await;
        assert_eq!(seen.lock().unwrap().as_str(), "boom");
    }

    #[tokio::test]
    async fn test_default_error_handler_writes_500_with_message() {
        let (ctx, writer) = test_context();
        default_error_handler(ctx, Error::msg("database unavailable")).await;
        let writer = writer.lock().unwrap();
        assert_eq!(writer.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(writer.body_bytes(), b"database unavailable\n");
    }

    #[tokio::test]
    async fn test_default_not_found_writes_404() {
        let (ctx, writer) = test_context();
        default_not_found(ctx).await.unwrap();
        let writer = writer.lock().unwrap();
        assert_eq!(writer.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(writer.body_bytes(), b"404 page not found\n");
    }
}
