//! perflab server
//!
//! - gRPC `helloworld.Greeter/SayHello` on `--port` (default 50051)
//! - Prometheus `/metrics` on `--metrics-port` (default 2112)
//! - Any bind or serve failure exits the process

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use perflab_core::PerfLabError;
use perflab_server::config::Cli;
use perflab_server::obs::MetricsRegistry;
use perflab_server::{app_state::AppState, Supervisor};

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("perflab_server=info"));
    fmt().with_env_filter(filter).init();

    let cfg = match Cli::parse().resolve() {
        Ok(cfg) => cfg,
        Err(e) => fatal(e),
    };

    let registry = Arc::new(MetricsRegistry::new());
    let state = AppState::new(cfg, registry);

    tracing::info!("perflab-server starting");
    let err = Supervisor::new(state).run().await;
    fatal(err)
}

fn fatal(err: PerfLabError) -> ! {
    let kind = err.kind();
    tracing::error!(kind = kind.as_str(), error = %err, "fatal");
    eprintln!("perflab-server: {err}");
    std::process::exit(kind.exit_code())
}
