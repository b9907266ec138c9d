//! Session-management control packet format for fabric-rpc.
//!
//! This crate defines the fixed-format control packets exchanged over the
//! unreliable side channel while sessions are established and torn down,
//! together with the endpoint metadata they carry.
//!
//! ## Packet layout
//!
//! ```text
//! +----------------------+------------------------------+
//! | u8 version           | must be SM_PKT_VERSION       |
//! +----------------------+------------------------------+
//! | u8 pkt_type          | Connect/Disconnect Req/Resp  |
//! +----------------------+------------------------------+
//! | u8 err_type          | NoError on requests          |
//! +----------------------+------------------------------+
//! | u8 reserved          | must be zero                 |
//! +----------------------+------------------------------+
//! | u64 uniq_token       | correlation token            |
//! +----------------------+------------------------------+
//! | client endpoint      | always complete              |
//! +----------------------+------------------------------+
//! | server endpoint      | partial on requests          |
//! +----------------------+------------------------------+
//! ```
//!
//! Encoding is big-endian throughout; one packet fits one datagram.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod endpoint;
pub mod error;
pub mod packet;

pub use endpoint::{
    RoutingInfo, SessionEndpoint, TransportType, INVALID_SESSION_NUM, MAX_HOSTNAME_LEN,
    MAX_PHY_PORTS, MAX_ROUTING_INFO_LEN,
};
pub use error::PacketError;
pub use packet::{SmErrType, SmPkt, SmPktType, MAX_SM_PKT_SIZE, SM_PKT_VERSION};
