//! Server address resolution
//!
//! The configured port is a service string. It may be numeric (`"6667"`) or
//! a symbolic service name (`"ircd"`), which is looked up in the system
//! services database before falling back to the well-known IRC ports.

use crate::{Error, Result};
use std::net::SocketAddr;
use tokio::net::lookup_host;
use tracing::debug;

/// System services database
pub const SERVICES_PATH: &str = "/etc/services";

/// IANA assignments used when the services database is unavailable
const WELL_KNOWN_SERVICES: &[(&str, u16)] = &[
    ("irc", 194),
    ("ircd", 6667),
    ("ircu", 6667),
    ("ircs", 994),
    ("ircs-u", 6697),
];

/// Find the TCP port for `service` in the contents of a services database
pub fn parse_services(contents: &str, service: &str) -> Option<u16> {
    contents.lines().find_map(|line| {
        let line = line.split('#').next().unwrap_or("");
        let mut fields = line.split_whitespace();
        let name = fields.next()?;
        let (port, protocol) = fields.next()?.split_once('/')?;

        if protocol != "tcp" {
            return None;
        }

        if name == service || fields.any(|alias| alias == service) {
            port.parse().ok()
        } else {
            None
        }
    })
}

/// Resolve a service string to a TCP port
pub async fn service_port(service: &str) -> Option<u16> {
    if let Ok(port) = service.parse::<u16>() {
        return Some(port);
    }

    match tokio::fs::read_to_string(SERVICES_PATH).await {
        Ok(contents) => {
            if let Some(port) = parse_services(&contents, service) {
                return Some(port);
            }
        }
        Err(e) => debug!("Could not read {}: {}", SERVICES_PATH, e),
    }

    WELL_KNOWN_SERVICES
        .iter()
        .find(|(name, _)| *name == service)
        .map(|&(_, port)| port)
}

/// Resolve `server` and `service` to every candidate socket address, in resolver order
pub async fn resolve(server: &str, service: &str) -> Result<Vec<SocketAddr>> {
    let failed = |reason: String| Error::ResolutionFailed {
        server: server.to_string(),
        port: service.to_string(),
        reason,
    };

    let port = service_port(service)
        .await
        .ok_or_else(|| failed("unknown service".to_string()))?;

    let addrs: Vec<SocketAddr> = lookup_host((server, port))
        .await
        .map_err(|e| failed(e.to_string()))?
        .collect();

    if addrs.is_empty() {
        return Err(failed("no addresses returned".to_string()));
    }

    debug!("Resolved {}:{} to {} address(es)", server, service, addrs.len());
    Ok(addrs)
}
