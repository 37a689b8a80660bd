use std::net::{IpAddr, TcpListener};

use log::debug;

use crate::error::OrchestratorError;

/// Finds `n` ports that can currently be bound on `host`.
///
/// Ports are tried upward from `base`, the ones that are taken are skipped.
///
/// # Arguments
/// * `host` - The interface the nodes will listen on.
/// * `base` - The first port to try.
/// * `n` - The amount of ports needed.
///
/// # Returns
/// `n` distinct ports in increasing order.
pub fn allocate(host: IpAddr, base: u16, n: usize) -> Result<Vec<u16>, OrchestratorError> {
    let mut ports = Vec::with_capacity(n);

    for port in base..=u16::MAX {
        if ports.len() == n {
            break;
        }

        match TcpListener::bind((host, port)) {
            Ok(_) => ports.push(port),
            Err(e) => debug!(port = port; "skipping port: {e}"),
        }
    }

    if ports.len() < n {
        return Err(OrchestratorError::NoFreePorts {
            needed: n,
            found: ports.len(),
        });
    }

    Ok(ports)
}
