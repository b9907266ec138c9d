//! Session endpoint metadata.
//!
//! A [`SessionEndpoint`] describes one side of a session: which fabric
//! transport it speaks, where it lives, and the slot/sequence bookkeeping the
//! peer assigned during the handshake. Endpoints travel inside every control
//! packet, so the encoding is a fixed big-endian layout with length-prefixed
//! variable fields.

use crate::PacketError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Maximum hostname length carried in an endpoint
pub const MAX_HOSTNAME_LEN: usize = 128;

/// Maximum opaque routing info length carried in an endpoint
pub const MAX_ROUTING_INFO_LEN: usize = 64;

/// Number of fabric device ports a runtime instance may address
pub const MAX_PHY_PORTS: u8 = 8;

/// Session number used before the peer has assigned one
pub const INVALID_SESSION_NUM: u16 = u16::MAX;

/// Fast-path transport kinds
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportType {
    /// InfiniBand verbs
    InfiniBand = 1,
    /// RoCE verbs
    RoCe = 2,
    /// DPDK userspace ethernet
    Dpdk = 3,
}

impl TryFrom<u8> for TransportType {
    type Error = PacketError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TransportType::InfiniBand),
            2 => Ok(TransportType::RoCe),
            3 => Ok(TransportType::Dpdk),
            _ => Err(PacketError::TransportType(value)),
        }
    }
}

/// Opaque fabric routing info filled by the fast-path transport
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingInfo(Vec<u8>);

impl RoutingInfo {
    /// Wrap routing bytes, enforcing the length bound
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() > MAX_ROUTING_INFO_LEN {
            return Err(PacketError::RoutingLen(bytes.len()));
        }
        Ok(Self(bytes.to_vec()))
    }

    /// Raw routing bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// True while the peer has not yet filled the routing info
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Metadata describing one side of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEndpoint {
    /// Fast-path transport kind, copied verbatim from the transport
    pub transport_type: TransportType,
    /// Hostname of the owning runtime instance
    pub hostname: String,
    /// Runtime identifier within the host
    pub rpc_id: u64,
    /// Fabric device port index
    pub phy_port: u8,
    /// Slot index in the owner's session table
    pub session_num: u16,
    /// Starting sequence number for data-path ordering
    pub start_seq: u64,
    /// Opaque fabric addressing info
    pub routing_info: RoutingInfo,
}

impl SessionEndpoint {
    /// Endpoint identity as used for request deduplication: hostname,
    /// runtime id, session number, and starting sequence number.
    pub fn same_identity(&self, other: &SessionEndpoint) -> bool {
        self.hostname == other.hostname
            && self.rpc_id == other.rpc_id
            && self.session_num == other.session_num
            && self.start_seq == other.start_seq
    }

    /// Short label for diagnostics, e.g. `host-3/7`
    pub fn label(&self) -> String {
        format!("{}/{}", self.hostname, self.rpc_id)
    }

    /// Encode the endpoint (big-endian, length-prefixed variable fields)
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), PacketError> {
        if self.hostname.is_empty() || self.hostname.len() > MAX_HOSTNAME_LEN {
            return Err(PacketError::HostnameLen(self.hostname.len()));
        }
        if self.routing_info.0.len() > MAX_ROUTING_INFO_LEN {
            return Err(PacketError::RoutingLen(self.routing_info.0.len()));
        }

        buf.put_u8(self.transport_type as u8);
        buf.put_u8(self.phy_port);
        buf.put_u16(self.session_num);
        buf.put_u64(self.rpc_id);
        buf.put_u64(self.start_seq);
        buf.put_u8(self.hostname.len() as u8);
        buf.put_slice(self.hostname.as_bytes());
        buf.put_u8(self.routing_info.0.len() as u8);
        buf.put_slice(&self.routing_info.0);
        Ok(())
    }

    /// Decode one endpoint from the buffer
    pub fn decode(buf: &mut Bytes) -> Result<Self, PacketError> {
        // Fixed prefix: type, port, session_num, rpc_id, start_seq, name len
        if buf.len() < 1 + 1 + 2 + 8 + 8 + 1 {
            return Err(PacketError::Incomplete);
        }

        let transport_type = TransportType::try_from(buf.get_u8())?;
        let phy_port = buf.get_u8();
        let session_num = buf.get_u16();
        let rpc_id = buf.get_u64();
        let start_seq = buf.get_u64();

        let hostname_len = buf.get_u8() as usize;
        if hostname_len == 0 || hostname_len > MAX_HOSTNAME_LEN {
            return Err(PacketError::HostnameLen(hostname_len));
        }
        if buf.len() < hostname_len + 1 {
            return Err(PacketError::Incomplete);
        }
        let hostname_bytes = buf.split_to(hostname_len);
        let hostname = std::str::from_utf8(&hostname_bytes)
            .map_err(|_| PacketError::HostnameUtf8)?
            .to_string();

        let routing_len = buf.get_u8() as usize;
        if routing_len > MAX_ROUTING_INFO_LEN {
            return Err(PacketError::RoutingLen(routing_len));
        }
        if buf.len() < routing_len {
            return Err(PacketError::Incomplete);
        }
        let routing_info = RoutingInfo(buf.split_to(routing_len).to_vec());

        Ok(Self {
            transport_type,
            hostname,
            rpc_id,
            phy_port,
            session_num,
            start_seq,
            routing_info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> SessionEndpoint {
        SessionEndpoint {
            transport_type: TransportType::InfiniBand,
            hostname: "node-1.example".to_string(),
            rpc_id: 17,
            phy_port: 0,
            session_num: 4,
            start_seq: 0x1234_5678_9ABC_DEF0,
            routing_info: RoutingInfo::from_slice(&[1, 2, 3, 4]).unwrap(),
        }
    }

    #[test]
    fn test_transport_type_conversion() {
        assert_eq!(TransportType::try_from(1).unwrap(), TransportType::InfiniBand);
        assert_eq!(TransportType::try_from(3).unwrap(), TransportType::Dpdk);
        assert!(TransportType::try_from(0).is_err());
        assert!(TransportType::try_from(0xFF).is_err());
    }

    #[test]
    fn test_endpoint_encode_decode() {
        let ep = endpoint();
        let mut buf = BytesMut::new();
        ep.encode(&mut buf).unwrap();

        let mut bytes = buf.freeze();
        let decoded = SessionEndpoint::decode(&mut bytes).unwrap();
        assert_eq!(ep, decoded);
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_endpoint_rejects_overlong_hostname() {
        let mut ep = endpoint();
        ep.hostname = "h".repeat(MAX_HOSTNAME_LEN + 1);
        let mut buf = BytesMut::new();
        assert!(matches!(
            ep.encode(&mut buf),
            Err(PacketError::HostnameLen(_))
        ));
    }

    #[test]
    fn test_routing_info_bound() {
        assert!(RoutingInfo::from_slice(&[0u8; MAX_ROUTING_INFO_LEN]).is_ok());
        assert!(RoutingInfo::from_slice(&[0u8; MAX_ROUTING_INFO_LEN + 1]).is_err());
    }

    #[test]
    fn test_same_identity_ignores_routing_info() {
        let a = endpoint();
        let mut b = endpoint();
        b.routing_info = RoutingInfo::default();
        b.phy_port = 1;
        assert!(a.same_identity(&b));

        let mut c = endpoint();
        c.start_seq += 1;
        assert!(!a.same_identity(&c));
    }
}
