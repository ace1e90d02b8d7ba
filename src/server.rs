//! HTTP server: the transport boundary and the terminal responder.
//!
//! The router itself never answers "nothing matched" — dispatch hands
//! control back, and whoever invoked it decides. This server is that
//! terminal responder: an unfinished dispatch with no error becomes a 404,
//! an in-flight error becomes its requested status (500 by default) with
//! the error text as the body. Embedders who call
//! [`Router::dispatch`](crate::Router::dispatch) directly supply their own
//! policy.
//!
//! # Graceful shutdown
//!
//! On SIGTERM or Ctrl-C the server stops accepting immediately, lets every
//! in-flight connection task run to completion, and returns from
//! [`Server::serve`]. Size your orchestrator's grace period to your slowest
//! request.

use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::BodyExt;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::Error;
use crate::flow::Flow;
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr }
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;

        // Shared across connection tasks without copying the layer stack.
        let router = Arc::new(router);

        info!(addr = %self.addr, "trellis listening");

        // Tracks every spawned connection task so shutdown can drain them.
        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting even if
                // more connections are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { respond(router, req).await }
                        });

                        // Serves whichever of HTTP/1.1 and HTTP/2 the
                        // client negotiates.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished tasks so the set does not grow without
                // bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("trellis stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Hot path: one hyper request in, one dispatch, one response out.
///
/// The error type is [`Infallible`](std::convert::Infallible) — every
/// failure becomes an HTTP response here, hyper never sees an error.
async fn respond(
    router: Arc<Router>,
    hreq: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<http_body_util::Full<bytes::Bytes>>, std::convert::Infallible> {
    let Ok(method) = hreq.method().as_str().parse::<Method>() else {
        warn!(method = %hreq.method(), "unimplemented method");
        let mut res = Response::new();
        res.set_status(501);
        res.end("Not Implemented");
        return Ok(res.into_http());
    };

    let url = hreq.uri().to_string();
    let mut req = Request::new(method, url.clone());
    for (name, value) in hreq.headers() {
        if let Ok(value) = value.to_str() {
            req = req.with_header(name.as_str(), value);
        }
    }

    let body = match hreq.into_body().collect().await {
        Ok(collected) => collected.to_bytes().to_vec(),
        Err(e) => {
            warn!("failed to read request body: {e}");
            let mut res = Response::new();
            res.set_status(400);
            res.end("Bad Request");
            return Ok(res.into_http());
        }
    };
    req = req.with_body(body);

    let mut res = Response::new();
    let flow = router.dispatch(&mut req, &mut res).await;
    Ok(finalize(method, &url, res, flow).into_http())
}

/// The terminal responder: turns an exhausted dispatch into a response.
fn finalize(method: Method, url: &str, res: Response, flow: Flow) -> Response {
    if res.finished() {
        return res;
    }
    match flow {
        Flow::Fail(e) => {
            let mut out = Response::new();
            out.set_status(e.status().unwrap_or(500));
            out.header("content-type", "text/plain; charset=utf-8");
            out.end(e.to_string());
            out
        }
        Flow::Next | Flow::SkipRoute => {
            let mut out = Response::new();
            out.set_status(404);
            out.header("content-type", "text/plain; charset=utf-8");
            out.end(format!("Cannot {method} {url}"));
            out
        }
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both SIGTERM and SIGINT (Ctrl-C); elsewhere
/// only Ctrl-C is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
