//! Service supervisor: binds both listeners and serves them until one fails.
//!
//! Lifecycle: `Idle -> Starting -> Running -> Terminated`. Binding happens
//! entirely in `Starting`, so a bind failure on either port ends the run
//! before any call is served. Once running, the first listener to fail (or
//! to stop) ends the whole run; there is no mode where one keeps serving
//! without the other, and no graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tonic::transport::server::Router as GrpcRouter;
use tower::layer::util::{Identity, Stack};

use perflab_core::error::{PerfLabError, Result};

use crate::app_state::AppState;
use crate::listener::{self, AcceptFailure};
use crate::middleware::GrpcMetricsLayer;
use crate::router;
use crate::services::GreeterService;
use crate::transport::{method_catalog, with_reflection, GreeterServer};

const GRPC_LISTENER: &str = "grpc";
const METRICS_LISTENER: &str = "metrics";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Starting,
    Running,
    Terminated,
}

pub struct Supervisor {
    app: AppState,
    state: watch::Sender<SupervisorState>,
}

impl Supervisor {
    pub fn new(app: AppState) -> Self {
        let (state, _) = watch::channel(SupervisorState::Idle);
        Self { app, state }
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    /// Observe lifecycle transitions (also after `bind`/`run` consume self).
    pub fn subscribe(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    /// Bind both listeners and build the gRPC stack.
    pub async fn bind(self) -> Result<BoundSupervisor> {
        let Supervisor { app, state } = self;
        state.send_replace(SupervisorState::Starting);
        match Listeners::bind(&app).await {
            Ok(listeners) => Ok(BoundSupervisor {
                app,
                state,
                listeners,
            }),
            Err(e) => {
                state.send_replace(SupervisorState::Terminated);
                Err(e)
            }
        }
    }

    /// Bind, then serve until a fatal error. Never returns on the happy path.
    pub async fn run(self) -> PerfLabError {
        match self.bind().await {
            Ok(bound) => bound.run().await,
            Err(e) => e,
        }
    }
}

async fn bind_listener(listener: &'static str, addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| PerfLabError::Bind { listener, addr, source })
}

fn local_addr(listener: &'static str, l: &TcpListener) -> Result<SocketAddr> {
    l.local_addr().map_err(|e| PerfLabError::Internal(format!("{listener} local_addr: {e}")))
}

struct Listeners {
    grpc: TcpListener,
    metrics: TcpListener,
    grpc_addr: SocketAddr,
    metrics_addr: SocketAddr,
    routes: GrpcRouter<Stack<GrpcMetricsLayer, Identity>>,
}

impl Listeners {
    async fn bind(app: &AppState) -> Result<Self> {
        let server = &app.cfg().server;

        let metrics = bind_listener(METRICS_LISTENER, server.metrics_addr()?).await?;
        let grpc = bind_listener(GRPC_LISTENER, server.grpc_addr()?).await?;

        let grpc_addr = local_addr(GRPC_LISTENER, &grpc)?;
        let metrics_addr = local_addr(METRICS_LISTENER, &metrics)?;

        let routes = tonic::transport::Server::builder()
            .layer(GrpcMetricsLayer::new(
                app.instrumentation(),
                Arc::new(method_catalog()),
            ))
            .add_service(GreeterServer::new(GreeterService::new()));
        let routes = with_reflection(routes)?;

        Ok(Self {
            grpc,
            metrics,
            grpc_addr,
            metrics_addr,
            routes,
        })
    }
}

/// Both listeners bound; nothing served yet.
pub struct BoundSupervisor {
    app: AppState,
    state: watch::Sender<SupervisorState>,
    listeners: Listeners,
}

impl BoundSupervisor {
    pub fn grpc_addr(&self) -> SocketAddr {
        self.listeners.grpc_addr
    }

    pub fn metrics_addr(&self) -> SocketAddr {
        self.listeners.metrics_addr
    }

    /// Serve both listeners concurrently. Returns the error that ended the
    /// run; every return is fatal.
    pub async fn run(self) -> PerfLabError {
        let BoundSupervisor {
            app,
            state,
            listeners,
        } = self;
        let Listeners {
            grpc,
            metrics,
            grpc_addr,
            metrics_addr,
            routes,
        } = listeners;

        state.send_replace(SupervisorState::Running);
        tracing::info!(%metrics_addr, "metrics server listening");
        tracing::info!(%grpc_addr, "server listening");

        let grpc_failure = AcceptFailure::default();
        let grpc_incoming = Box::pin(listener::incoming(
            listener::tcp_accept(grpc),
            grpc_failure.clone(),
        ));
        let grpc_loop = routes.serve_with_incoming(grpc_incoming);
        let metrics_loop = listener::serve_http(metrics, router::build_router(app));

        let err = tokio::select! {
            res = grpc_loop => {
                let reason = match res {
                    Err(e) => e.to_string(),
                    Ok(()) => match grpc_failure.take() {
                        Some(e) => format!("accept failed: {e}"),
                        None => "accept loop stopped".to_string(),
                    },
                };
                serve_ended(GRPC_LISTENER, reason)
            }
            e = metrics_loop => serve_ended(METRICS_LISTENER, format!("accept failed: {e}")),
        };

        state.send_replace(SupervisorState::Terminated);
        err
    }
}

fn serve_ended(listener: &'static str, reason: String) -> PerfLabError {
    tracing::error!(listener, %reason, "listener terminated");
    PerfLabError::Serve { listener, reason }
}
