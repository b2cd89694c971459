//! Shared application state for the perflab server.
//!
//! - Owns the process-wide `MetricsRegistry` handle (passed in, never global).
//! - Builds the call instrumentation once so both families are registered
//!   before the first scrape.

use std::sync::Arc;

use crate::config::PerfLabConfig;
use crate::middleware::CallInstrumentation;
use crate::obs::{MetricsRegistry, RegistrySnapshot};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: PerfLabConfig,
    instrumentation: CallInstrumentation,
}

impl AppState {
    pub fn new(cfg: PerfLabConfig, registry: Arc<MetricsRegistry>) -> Self {
        let instrumentation = CallInstrumentation::new(registry);
        Self {
            inner: Arc::new(AppStateInner { cfg, instrumentation }),
        }
    }

    pub fn cfg(&self) -> &PerfLabConfig {
        &self.inner.cfg
    }

    pub fn instrumentation(&self) -> CallInstrumentation {
        self.inner.instrumentation.clone()
    }

    pub fn metrics_snapshot(&self) -> RegistrySnapshot {
        self.inner.instrumentation.registry().snapshot()
    }
}
