//! Utilities for spinning up a prometheus metrics server.

use crate::PrometheusError;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::{IpAddr, SocketAddr, TcpListener};
use tracing::{debug, info};

/// How many OS-assigned ports are tried before giving up.
const EPHEMERAL_PORT_ATTEMPTS: usize = 3;

/// Starts a Prometheus metrics server on the given address and port, returning the address
/// it serves on.
///
/// A port of `0` lets the OS pick a free port. The exporter binds its own listener, so the
/// picked port is released before the exporter claims it. If another process takes it in
/// between, a fresh port is picked.
pub fn init_prometheus_server(addr: IpAddr, port: u16) -> Result<SocketAddr, PrometheusError> {
    if port != 0 {
        return install(SocketAddr::from((addr, port)));
    }

    let mut attempt = 1;
    loop {
        let listen_addr = TcpListener::bind((addr, 0))?.local_addr()?;
        match install(listen_addr) {
            Err(PrometheusError::Build(BuildError::FailedToCreateHTTPListener(err)))
                if attempt < EPHEMERAL_PORT_ATTEMPTS =>
            {
                debug!(target: "prometheus", %listen_addr, %err, "Metrics port taken, retrying");
                attempt += 1;
            }
            result => return result,
        }
    }
}

fn install(listen_addr: SocketAddr) -> Result<SocketAddr, PrometheusError> {
    PrometheusBuilder::new().with_http_listener(listen_addr).install()?;
    info!(target: "prometheus", "Serving metrics at: http://{}", listen_addr);
    Ok(listen_addr)
}
