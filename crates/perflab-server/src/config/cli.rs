//! Command-line flags. A flag beats the config file, which beats defaults.

use clap::Parser;

use perflab_core::error::Result;

use super::{load_from_file, PerfLabConfig};

#[derive(Debug, Parser)]
#[command(name = "perflab-server", about = "Instrumented greeter gRPC server")]
pub struct Cli {
    /// YAML config file.
    #[arg(long)]
    pub config: Option<String>,

    /// Bind address for both listeners.
    #[arg(long)]
    pub host: Option<String>,

    /// The server port.
    #[arg(long)]
    pub port: Option<u16>,

    /// The metrics port.
    #[arg(long = "metrics-port")]
    pub metrics_port: Option<u16>,
}

impl Cli {
    /// Merge flags over the file (or defaults) and validate the result.
    pub fn resolve(self) -> Result<PerfLabConfig> {
        let mut cfg = match &self.config {
            Some(path) => load_from_file(path)?,
            None => PerfLabConfig::default(),
        };

        if let Some(host) = self.host {
            cfg.server.host = host;
        }
        if let Some(port) = self.port {
            cfg.server.port = port;
        }
        if let Some(port) = self.metrics_port {
            cfg.server.metrics_port = port;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_flags() {
        let cfg = Cli::parse_from(["perflab-server"]).resolve().unwrap();
        assert_eq!(cfg.server.port, 50051);
        assert_eq!(cfg.server.metrics_port, 2112);
        assert_eq!(cfg.server.host, "0.0.0.0");
    }

    #[test]
    fn flags_override_defaults() {
        let cfg = Cli::parse_from([
            "perflab-server",
            "--port",
            "6000",
            "--metrics-port",
            "6001",
            "--host",
            "127.0.0.1",
        ])
        .resolve()
        .unwrap();
        assert_eq!(cfg.server.grpc_addr().unwrap().to_string(), "127.0.0.1:6000");
        assert_eq!(cfg.server.metrics_addr().unwrap().to_string(), "127.0.0.1:6001");
    }

    #[test]
    fn same_port_for_both_listeners_is_rejected() {
        let err = Cli::parse_from(["perflab-server", "--port", "7000", "--metrics-port", "7000"])
            .resolve()
            .unwrap_err();
        assert_eq!(err.kind().as_str(), "CONFIG");
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        let err = Cli::parse_from(["perflab-server", "--config", "/nonexistent/perflab.yaml"])
            .resolve()
            .unwrap_err();
        assert_eq!(err.kind().as_str(), "CONFIG");
    }
}
