//! perflab server library entry.
//!
//! This crate wires the gRPC transport, the metrics layer, the greeter
//! service, and the `/metrics` endpoint into one supervised process. It is
//! intended to be consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod listener;
pub mod middleware;
pub mod obs;
pub mod ops;
pub mod router;
pub mod services;
pub mod supervisor;
pub mod transport;

pub use supervisor::{BoundSupervisor, Supervisor, SupervisorState};
