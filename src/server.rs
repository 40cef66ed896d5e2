//! HTTP server implementation and lifecycle management.
//!
//! Built on hyper's HTTP/1.1 connection driver: every accepted connection runs on
//! its own tokio task, each request is boxed into [`Body`] and dispatched through
//! the [`Router`], and the peer address is stored in the request extensions.
//!
//! # Examples
//!
//! ```rust,no_run
//! use pdfpress::{serve, router::Router};
//! use tokio::net::TcpListener;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> std::io::Result<()> {
//! let listener = TcpListener::bind("127.0.0.1:3000").await?;
//! let router = Router::new();
//! serve(listener, router, CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

use std::{convert::Infallible, io, sync::Arc};

use hyper::{body::Incoming, server::conn::http1, service::service_fn};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, info};

use crate::{body::Body, router::Router};

/// Serves `router` on `listener` until `shutdown` is cancelled.
///
/// On shutdown the listener stops accepting, open connections are asked to close
/// after their current response, and the call returns once all of them are done.
/// Handlers holding the same token see it cancelled too: the compression endpoint
/// abandons in-flight work and answers 500 "Server is shutting down".
///
/// # Errors
///
/// Returns the first error reported by `accept`.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> io::Result<()> {
    let router = Arc::new(router);
    let connections = TaskTracker::new();

    info!(addr = %listener.local_addr()?, "listening");

    loop {
        let (stream, addr) = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted?,
        };

        let io = TokioIo::new(stream);
        let router = router.clone();
        let shutdown = shutdown.clone();

        connections.spawn(async move {
            let svc = service_fn(move |req: hyper::Request<Incoming>| {
                let router = router.clone();
                async move {
                    let mut req = req.map(Body::new);
                    req.extensions_mut().insert(addr);
                    Ok::<_, Infallible>(router.dispatch(req).await)
                }
            });

            let mut http = http1::Builder::new();
            http.keep_alive(true);
            let conn = http.serve_connection(io, svc);
            tokio::pin!(conn);

            let res = tokio::select! {
                res = conn.as_mut() => res,
                _ = shutdown.cancelled() => {
                    conn.as_mut().graceful_shutdown();
                    conn.await
                }
            };
            if let Err(err) = res {
                debug!(peer = %addr, error = %err, "connection closed with error");
            }
        });
    }

    connections.close();
    info!(open = connections.len(), "draining connections");
    connections.wait().await;
    Ok(())
}
