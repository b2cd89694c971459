//! Shared error type across perflab crates.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Stable error categories (used for logs and process exit codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid configuration (file, flags, or values).
    Config,
    /// Unsupported config version.
    UnsupportedVersion,
    /// A listener could not be bound.
    Bind,
    /// An accept/serve loop failed while running.
    Serve,
    /// Internal error.
    Internal,
}

impl ErrorKind {
    /// String representation used in structured logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Config => "CONFIG",
            ErrorKind::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorKind::Bind => "BIND",
            ErrorKind::Serve => "SERVE",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    /// Process exit status for a fatal error of this kind.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Config | ErrorKind::UnsupportedVersion => 2,
            ErrorKind::Bind | ErrorKind::Serve | ErrorKind::Internal => 1,
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PerfLabError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum PerfLabError {
    #[error("config: {0}")]
    Config(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("failed to bind {listener} listener on {addr}: {source}")]
    Bind {
        listener: &'static str,
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("{listener} listener failed: {reason}")]
    Serve {
        listener: &'static str,
        reason: String,
    },
    #[error("internal: {0}")]
    Internal(String),
}

impl PerfLabError {
    /// Map the error to its stable category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PerfLabError::Config(_) => ErrorKind::Config,
            PerfLabError::UnsupportedVersion => ErrorKind::UnsupportedVersion,
            PerfLabError::Bind { .. } => ErrorKind::Bind,
            PerfLabError::Serve { .. } => ErrorKind::Serve,
            PerfLabError::Internal(_) => ErrorKind::Internal,
        }
    }
}
