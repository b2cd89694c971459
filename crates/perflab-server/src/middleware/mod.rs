//! Call instrumentation.
//!
//! - [`MethodCatalog`]: the methods the server serves; everything else is `unknown`.
//! - [`CallInstrumentation`]: counts started calls and records finished ones.
//! - [`GrpcMetricsLayer`]: tower layer that applies it to every request the
//!   gRPC server receives and finishes each call when its outcome is known.
//!
//! This is the only place calls are counted; handlers stay metric-free.

pub mod instrument;
pub mod layer;
pub mod methods;

pub use instrument::{
    code_name, CallInstrumentation, InFlightCall, HANDLED, HANDLING_BUCKETS, HANDLING_SECONDS,
    REQUESTS_PROCESSED, REQUEST_DURATION, STARTED,
};
pub use layer::{GrpcMetricsLayer, GrpcMetricsService, InstrumentedBody};
pub use methods::{GrpcType, MethodCatalog, MethodInfo};
