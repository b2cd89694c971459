//! Built-in RPC services.

pub mod greeter;

pub use greeter::{greeting, GreeterService};
