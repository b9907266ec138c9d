//! Fast-path transport collaborator.
//!
//! The session subsystem never moves data-path traffic; it only asks the
//! fabric transport which ports it manages and for the opaque routing bytes
//! a peer needs to address this endpoint.

use fabric_wire::{RoutingInfo, TransportType, MAX_PHY_PORTS};

/// Contract consumed from the fast-path fabric transport
pub trait FabricTransport {
    /// Stable transport kind, copied verbatim into session metadata
    fn transport_type(&self) -> TransportType;

    /// True when this runtime instance manages the given fabric port
    fn is_port_managed(&self, phy_port: u8) -> bool;

    /// Populate fabric addressing info for the local endpoint on a port
    fn fill_routing_info(&self, phy_port: u8) -> RoutingInfo;
}

/// Process-local fabric stand-in for demos and tests. Routing info is a
/// deterministic function of the port so handshakes are reproducible.
#[derive(Debug, Clone)]
pub struct LoopbackFabric {
    transport_type: TransportType,
    managed_ports: Vec<u8>,
}

impl LoopbackFabric {
    /// Create a loopback fabric managing the given ports
    pub fn new(transport_type: TransportType, managed_ports: Vec<u8>) -> Self {
        Self {
            transport_type,
            managed_ports,
        }
    }
}

impl Default for LoopbackFabric {
    fn default() -> Self {
        Self::new(TransportType::InfiniBand, vec![0])
    }
}

impl FabricTransport for LoopbackFabric {
    fn transport_type(&self) -> TransportType {
        self.transport_type
    }

    fn is_port_managed(&self, phy_port: u8) -> bool {
        phy_port < MAX_PHY_PORTS && self.managed_ports.contains(&phy_port)
    }

    fn fill_routing_info(&self, phy_port: u8) -> RoutingInfo {
        let bytes = [b'l', b'o', b'o', b'p', self.transport_type as u8, phy_port];
        RoutingInfo::from_slice(&bytes).expect("loopback routing info is within bounds")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_port_management() {
        let fabric = LoopbackFabric::new(TransportType::RoCe, vec![0, 2]);
        assert!(fabric.is_port_managed(0));
        assert!(!fabric.is_port_managed(1));
        assert!(fabric.is_port_managed(2));
        assert!(!fabric.is_port_managed(MAX_PHY_PORTS));
    }

    #[test]
    fn test_loopback_routing_info_deterministic() {
        let fabric = LoopbackFabric::default();
        assert_eq!(fabric.fill_routing_info(0), fabric.fill_routing_info(0));
        assert_ne!(fabric.fill_routing_info(0), fabric.fill_routing_info(1));
    }
}
