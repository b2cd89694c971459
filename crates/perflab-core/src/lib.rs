//! perflab core: transport-agnostic protocol primitives and error types.
//!
//! This crate defines the helloworld wire messages, their protobuf file
//! descriptor, and the error surface shared by the server and tooling. It
//! carries no runtime or network dependencies so test clients can reuse it.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `PerfLabError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ErrorKind, PerfLabError, Result};
