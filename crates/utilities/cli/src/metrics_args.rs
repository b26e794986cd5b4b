//! Prometheus metrics flags.

use crate::{CliResult, init_prometheus_server};
use clap::Args;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Configuration for the Prometheus metrics exporter.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct MetricsArgs {
    /// Serves Prometheus metrics while the command runs.
    #[arg(long = "metrics.enabled", global = true, env = "BRIDGE_RPC_METRICS_ENABLED")]
    pub enabled: bool,
    /// The address the metrics server listens on.
    #[arg(
        long = "metrics.addr",
        global = true,
        default_value = "127.0.0.1",
        env = "BRIDGE_RPC_METRICS_ADDR"
    )]
    pub addr: IpAddr,
    /// The port the metrics server listens on.
    #[arg(
        long = "metrics.port",
        global = true,
        default_value_t = 9090,
        env = "BRIDGE_RPC_METRICS_PORT"
    )]
    pub port: u16,
}

impl Default for MetricsArgs {
    fn default() -> Self {
        Self { enabled: false, addr: IpAddr::V4(Ipv4Addr::LOCALHOST), port: 9090 }
    }
}

impl MetricsArgs {
    /// Starts the metrics server if enabled, returning the address it serves on.
    pub fn init_metrics(&self) -> CliResult<Option<SocketAddr>> {
        if !self.enabled {
            return Ok(None);
        }
        Ok(Some(init_prometheus_server(self.addr, self.port)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        metrics: MetricsArgs,
    }

    #[test]
    fn test_defaults() {
        let cli = TestCli::try_parse_from(["test"]).unwrap();
        assert_eq!(cli.metrics, MetricsArgs::default());
        assert_eq!(cli.metrics.init_metrics().unwrap(), None);
    }

    #[test]
    fn test_custom_flags() {
        let cli = TestCli::try_parse_from([
            "test",
            "--metrics.enabled",
            "--metrics.addr",
            "0.0.0.0",
            "--metrics.port",
            "9999",
        ])
        .unwrap();
        assert!(cli.metrics.enabled);
        assert_eq!(cli.metrics.addr, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(cli.metrics.port, 9999);
    }
}
