//! Control packet error types.

use thiserror::Error;

/// Errors raised while encoding or decoding session-management packets
#[derive(Error, Debug)]
pub enum PacketError {
    /// Datagram shorter than the declared layout
    #[error("incomplete packet")]
    Incomplete,

    /// Unsupported packet format version
    #[error("version unsupported: {0}")]
    Version(u8),

    /// Reserved byte nonzero
    #[error("reserved byte nonzero")]
    Reserved,

    /// Unknown packet type code
    #[error("unknown packet type {0}")]
    PktType(u8),

    /// Unknown error type code
    #[error("unknown error type {0}")]
    ErrType(u8),

    /// Unknown transport type code
    #[error("unknown transport type {0}")]
    TransportType(u8),

    /// Hostname empty or longer than the bounded maximum
    #[error("hostname length invalid: {0}")]
    HostnameLen(usize),

    /// Hostname bytes are not valid UTF-8
    #[error("hostname not utf-8")]
    HostnameUtf8,

    /// Routing info longer than the bounded maximum
    #[error("routing info length invalid: {0}")]
    RoutingLen(usize),

    /// Encoded packet exceeds the datagram size bound
    #[error("size limit exceeded: {0}")]
    Size(usize),
}
