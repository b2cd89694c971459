//! Accept loops for both listeners.
//!
//! Per-connection accept errors (the peer reset or aborted before we got
//! to it) are skipped. Anything else is fatal: the gRPC incoming stream
//! ends and parks the error in an [`AcceptFailure`], and the HTTP loop
//! returns it. Neither loop retries.

use std::future::Future;
use std::io;
use std::sync::Arc;

use futures_util::stream::{self, Stream};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};

pub fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

/// Next usable connection from `accept`, or the first fatal error.
pub async fn next_conn<A, Fut, T>(accept: &mut A) -> io::Result<T>
where
    A: FnMut() -> Fut,
    Fut: Future<Output = io::Result<T>>,
{
    loop {
        match accept().await {
            Ok(conn) => return Ok(conn),
            Err(e) if is_connection_error(&e) => {
                tracing::debug!(error = %e, "connection dropped during accept");
            }
            Err(e) => return Err(e),
        }
    }
}

/// Slot for the error that ended an incoming stream.
#[derive(Clone, Default)]
pub struct AcceptFailure(Arc<Mutex<Option<io::Error>>>);

impl AcceptFailure {
    fn record(&self, e: io::Error) {
        *self.0.lock() = Some(e);
    }

    pub fn take(&self) -> Option<io::Error> {
        self.0.lock().take()
    }
}

/// Connections from `accept` until the first fatal error, which lands in
/// `failure`.
pub fn incoming<A, Fut, T>(accept: A, failure: AcceptFailure) -> impl Stream<Item = io::Result<T>>
where
    A: FnMut() -> Fut,
    Fut: Future<Output = io::Result<T>>,
{
    stream::unfold((accept, failure), |(mut accept, failure)| async move {
        match next_conn(&mut accept).await {
            Ok(conn) => Some((Ok(conn), (accept, failure))),
            Err(e) => {
                failure.record(e);
                None
            }
        }
    })
}

/// `accept` closure over a shared listener.
pub fn tcp_accept(
    listener: TcpListener,
) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = io::Result<TcpStream>> + Send>> {
    let listener = Arc::new(listener);
    move || {
        let listener = Arc::clone(&listener);
        Box::pin(async move { listener.accept().await.map(|(stream, _)| stream) })
    }
}

/// Serve `app` on every accepted connection until accepting fails.
pub async fn serve_http(listener: TcpListener, app: axum::Router) -> io::Error {
    let mut accept = tcp_accept(listener);
    loop {
        let stream = match next_conn(&mut accept).await {
            Ok(stream) => stream,
            Err(e) => return e,
        };
        let svc = TowerToHyperService::new(app.clone());
        tokio::spawn(async move {
            let builder = auto::Builder::new(TokioExecutor::new());
            if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
                tracing::debug!(error = %e, "metrics connection error");
            }
        });
    }
}
