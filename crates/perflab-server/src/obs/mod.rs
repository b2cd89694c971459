//! In-process metrics: registry and Prometheus text rendering.
//!
//! The registry is created once in `main` and passed around as an
//! `Arc<MetricsRegistry>`; nothing here is a global.

pub mod exposition;
pub mod metrics;

pub use metrics::{MetricsRegistry, RegistrySnapshot, LATENCY_BUCKETS};
