//! Session-management control packets.
//!
//! One control packet fits in one datagram on the unreliable side channel.
//! The layout is a fixed big-endian header (version, type, error, token)
//! followed by the client and server endpoint metadata. Requests carry a
//! partially filled server endpoint; responses carry it complete.

use crate::endpoint::SessionEndpoint;
use crate::PacketError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Control packet format version
pub const SM_PKT_VERSION: u8 = 1;

/// Upper bound on one encoded control packet (fits a single datagram)
pub const MAX_SM_PKT_SIZE: usize = 512;

/// Session-management packet types
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmPktType {
    /// Client request to establish a session
    ConnectReq = 0x01,
    /// Server response to a connect request
    ConnectResp = 0x02,
    /// Client request to tear down a session
    DisconnectReq = 0x03,
    /// Server response to a disconnect request
    DisconnectResp = 0x04,
}

impl SmPktType {
    /// True for the two request types
    pub fn is_req(self) -> bool {
        matches!(self, SmPktType::ConnectReq | SmPktType::DisconnectReq)
    }
}

impl TryFrom<u8> for SmPktType {
    type Error = PacketError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(SmPktType::ConnectReq),
            0x02 => Ok(SmPktType::ConnectResp),
            0x03 => Ok(SmPktType::DisconnectReq),
            0x04 => Ok(SmPktType::DisconnectResp),
            _ => Err(PacketError::PktType(value)),
        }
    }
}

/// Error codes carried in control responses
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmErrType {
    /// Success
    NoError = 0,
    /// Session table capacity exhausted at the responder
    TooManySessions = 1,
    /// Requested fabric port is out of range or unmanaged
    InvalidRemotePort = 2,
    /// Responder could not resolve fabric routing info
    RoutingResolutionFailure = 3,
}

impl TryFrom<u8> for SmErrType {
    type Error = PacketError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SmErrType::NoError),
            1 => Ok(SmErrType::TooManySessions),
            2 => Ok(SmErrType::InvalidRemotePort),
            3 => Ok(SmErrType::RoutingResolutionFailure),
            _ => Err(PacketError::ErrType(value)),
        }
    }
}

/// One session-management control packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmPkt {
    /// Packet type
    pub pkt_type: SmPktType,
    /// Error code (NoError on requests)
    pub err_type: SmErrType,
    /// Correlation token; a retransmitted request keeps its token
    pub uniq_token: u64,
    /// Client endpoint metadata (always complete)
    pub client: SessionEndpoint,
    /// Server endpoint metadata (partial on requests)
    pub server: SessionEndpoint,
}

impl SmPkt {
    /// Build a connect request
    pub fn connect_req(uniq_token: u64, client: SessionEndpoint, server: SessionEndpoint) -> Self {
        Self {
            pkt_type: SmPktType::ConnectReq,
            err_type: SmErrType::NoError,
            uniq_token,
            client,
            server,
        }
    }

    /// Build a connect response
    pub fn connect_resp(
        err_type: SmErrType,
        uniq_token: u64,
        client: SessionEndpoint,
        server: SessionEndpoint,
    ) -> Self {
        Self {
            pkt_type: SmPktType::ConnectResp,
            err_type,
            uniq_token,
            client,
            server,
        }
    }

    /// Build a disconnect request
    pub fn disconnect_req(
        uniq_token: u64,
        client: SessionEndpoint,
        server: SessionEndpoint,
    ) -> Self {
        Self {
            pkt_type: SmPktType::DisconnectReq,
            err_type: SmErrType::NoError,
            uniq_token,
            client,
            server,
        }
    }

    /// Build a disconnect response
    pub fn disconnect_resp(
        err_type: SmErrType,
        uniq_token: u64,
        client: SessionEndpoint,
        server: SessionEndpoint,
    ) -> Self {
        Self {
            pkt_type: SmPktType::DisconnectResp,
            err_type,
            uniq_token,
            client,
            server,
        }
    }

    /// Encode the packet into one datagram-sized buffer
    pub fn encode(&self) -> Result<Bytes, PacketError> {
        let mut buf = BytesMut::with_capacity(MAX_SM_PKT_SIZE);

        buf.put_u8(SM_PKT_VERSION);
        buf.put_u8(self.pkt_type as u8);
        buf.put_u8(self.err_type as u8);
        buf.put_u8(0); // reserved
        buf.put_u64(self.uniq_token);

        self.client.encode(&mut buf)?;
        self.server.encode(&mut buf)?;

        if buf.len() > MAX_SM_PKT_SIZE {
            return Err(PacketError::Size(buf.len()));
        }
        Ok(buf.freeze())
    }

    /// Decode one packet from a received datagram
    pub fn decode(buf: &mut Bytes) -> Result<Self, PacketError> {
        if buf.len() < 4 + 8 {
            return Err(PacketError::Incomplete);
        }

        let ver = buf.get_u8();
        if ver != SM_PKT_VERSION {
            return Err(PacketError::Version(ver));
        }

        let pkt_type = SmPktType::try_from(buf.get_u8())?;
        let err_type = SmErrType::try_from(buf.get_u8())?;
        let reserved = buf.get_u8();
        if reserved != 0 {
            return Err(PacketError::Reserved);
        }

        let uniq_token = buf.get_u64();
        let client = SessionEndpoint::decode(buf)?;
        let server = SessionEndpoint::decode(buf)?;

        Ok(Self {
            pkt_type,
            err_type,
            uniq_token,
            client,
            server,
        })
    }
}
