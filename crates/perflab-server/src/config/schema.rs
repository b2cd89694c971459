use std::net::{IpAddr, SocketAddr};

use serde::Deserialize;
use perflab_core::error::{PerfLabError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerfLabConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,
}

impl Default for PerfLabConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
        }
    }
}

impl PerfLabConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(PerfLabError::UnsupportedVersion);
        }

        self.server.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Bind address shared by both listeners.
    #[serde(default = "default_host")]
    pub host: String,

    /// gRPC listener port (0 = ephemeral).
    #[serde(default = "default_port")]
    pub port: u16,

    /// `/metrics` listener port (0 = ephemeral).
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.ip()?;
        if self.port != 0 && self.port == self.metrics_port {
            return Err(PerfLabError::Config(format!(
                "server.port and server.metrics_port must differ (both {})",
                self.port
            )));
        }
        Ok(())
    }

    fn ip(&self) -> Result<IpAddr> {
        self.host
            .parse()
            .map_err(|_| PerfLabError::Config(format!("server.host is not an IP address: {}", self.host)))
    }

    pub fn grpc_addr(&self) -> Result<SocketAddr> {
        Ok(SocketAddr::new(self.ip()?, self.port))
    }

    pub fn metrics_addr(&self) -> Result<SocketAddr> {
        Ok(SocketAddr::new(self.ip()?, self.metrics_port))
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    50051
}
fn default_metrics_port() -> u16 {
    2112
}
