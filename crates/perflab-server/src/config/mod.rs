//! Server config loader (strict parsing).

pub mod cli;
pub mod schema;

use std::fs;

use perflab_core::error::{PerfLabError, Result};

pub use cli::Cli;
pub use schema::{PerfLabConfig, ServerSection};

pub fn load_from_file(path: &str) -> Result<PerfLabConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| PerfLabError::Config(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<PerfLabConfig> {
    let cfg: PerfLabConfig = serde_yaml::from_str(s)
        .map_err(|e| PerfLabError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
