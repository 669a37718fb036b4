//! HTTP adapter configuration.
//!
//! Only the listen address lives here; ledger storage comes from
//! `ledger::SnapshotConfig` and the port is taken from the CLI.

use std::net::{Ipv4Addr, SocketAddr};

/// Configuration for the node's HTTP server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP server to.
    pub listen_addr: SocketAddr,
}

impl ApiConfig {
    /// Binds all interfaces on `port`, so peers on other hosts can reach
    /// the gossip endpoints.
    pub fn for_port(port: u16) -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_port_binds_all_interfaces() {
        let cfg = ApiConfig::for_port(8900);
        assert_eq!(cfg.listen_addr.to_string(), "0.0.0.0:8900");
    }
}
