// HTTP and HTTPS accept loops
//
// Each connection is spawned onto its own task; hyper's auto builder picks
// HTTP/1.1 or HTTP/2 per connection. The loops watch the application's
// background and drain out when it is cancelled.

use crate::app::App;
use crate::error::Error;
use crate::tls::TlsConfig;
use hyper::Request;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info};

/// Serve `app` on `0.0.0.0:port` until its background is cancelled.
pub async fn serve(app: &App, port: u16) -> Result<(), Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    let background = app.background();
    info!("listening on http://{addr}");

    loop {
        let (stream, _) = tokio::select! {
            _ = background.cancelled() => {
                info!("shutting down listener on {addr}");
                return Ok(());
            }
            accepted = listener.accept() => accepted?,
        };
        let app = app.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let app = app.clone();
                async move { Ok::<_, Infallible>(app.handle(req).await) }
            });
            if let Err(err) = auto::Builder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!("connection error: {err:?}");
            }
        });
    }
}

/// Serve `app` over TLS on `0.0.0.0:port` until its background is
/// cancelled.
pub async fn serve_tls(app: &App, port: u16, tls: TlsConfig) -> Result<(), Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    let acceptor = TlsAcceptor::from(tls.server_config.clone());
    let background = app.background();
    info!("listening on https://{addr}");

    loop {
        let (stream, peer) = tokio::select! {
            _ = background.cancelled() => {
                info!("shutting down listener on {addr}");
                return Ok(());
            }
            accepted = listener.accept() => accepted?,
        };
        let acceptor = acceptor.clone();
        let app = app.clone();
        tokio::spawn(async move {
            let stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(err) => {
                    debug!("TLS handshake with {peer} failed: {err}");
                    return;
                }
            };
            let service = service_fn(move |req: Request<Incoming>| {
                let app = app.clone();
                async move { Ok::<_, Infallible>(app.handle(req).await) }
            });
            if let Err(err) = auto::Builder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!("connection error: {err:?}");
            }
        });
    }
}
