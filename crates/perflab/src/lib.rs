//! Top-level facade crate for perflab.
//!
//! Re-exports core types and the server library so users can depend on a single crate.

pub mod core {
    pub use perflab_core::*;
}

pub mod server {
    pub use perflab_server::*;
}
