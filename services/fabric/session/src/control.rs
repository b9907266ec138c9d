//! Unreliable control-message transport.
//!
//! Control packets ride a best-effort datagram side channel: sends are
//! fire-and-forget and may be dropped, duplicated, or reordered. The session
//! manager only needs [`ControlSender`]; receiving and retry cadence belong
//! to the surrounding event loop.

use bytes::Bytes;
use fabric_wire::{SmPkt, MAX_SM_PKT_SIZE};
use std::collections::VecDeque;
use std::io;
use std::net::ToSocketAddrs;
use std::sync::Mutex;
use tokio::net::UdpSocket;
use tracing::{debug, trace, warn};

/// Best-effort, non-blocking handoff of one control packet to a named peer
pub trait ControlSender {
    /// Send `pkt` towards `dest` (a hostname, optionally `host:port`).
    /// Never blocks; delivery is not guaranteed.
    fn send_packet(&self, dest: &str, pkt: &SmPkt);
}

impl<T: ControlSender + ?Sized> ControlSender for &T {
    fn send_packet(&self, dest: &str, pkt: &SmPkt) {
        (**self).send_packet(dest, pkt)
    }
}

impl<T: ControlSender + ?Sized> ControlSender for std::sync::Arc<T> {
    fn send_packet(&self, dest: &str, pkt: &SmPkt) {
        (**self).send_packet(dest, pkt)
    }
}

/// UDP control transport shared by all sessions of one runtime instance.
///
/// Every instance in a deployment listens on the same session-management
/// port, so a bare hostname destination is completed with that port. A
/// destination that already carries an explicit `host:port` is used as-is.
#[derive(Debug)]
pub struct UdpControlTransport {
    socket: UdpSocket,
    sm_port: u16,
}

impl UdpControlTransport {
    /// Bind the session-management socket. Port 0 binds an ephemeral port
    /// (useful in tests together with explicit-port destinations).
    pub async fn bind(sm_port: u16) -> io::Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", sm_port)).await?;
        let sm_port = socket.local_addr()?.port();
        Ok(Self { socket, sm_port })
    }

    /// Port this transport is bound to
    pub fn local_port(&self) -> u16 {
        self.sm_port
    }

    /// Receive the next well-formed control packet, skipping malformed
    /// datagrams. Cancel-safe: a cancelled call drops at most nothing.
    pub async fn recv_packet(&self) -> SmPkt {
        let mut buf = vec![0u8; MAX_SM_PKT_SIZE];
        loop {
            match self.socket.recv_from(&mut buf).await {
                Ok((len, from)) => {
                    let mut bytes = Bytes::copy_from_slice(&buf[..len]);
                    match SmPkt::decode(&mut bytes) {
                        Ok(pkt) => {
                            trace!("received {:?} packet from {}", pkt.pkt_type, from);
                            return pkt;
                        }
                        Err(e) => {
                            warn!("dropping malformed control packet from {}: {}", from, e);
                        }
                    }
                }
                Err(e) => {
                    warn!("control socket receive error: {}", e);
                }
            }
        }
    }

    fn resolve(&self, dest: &str) -> Option<std::net::SocketAddr> {
        let target = if dest.contains(':') {
            dest.to_string()
        } else {
            format!("{}:{}", dest, self.sm_port)
        };
        match target.to_socket_addrs() {
            Ok(mut addrs) => addrs.next(),
            Err(e) => {
                warn!("cannot resolve control destination {}: {}", target, e);
                None
            }
        }
    }
}

impl ControlSender for UdpControlTransport {
    fn send_packet(&self, dest: &str, pkt: &SmPkt) {
        let Some(addr) = self.resolve(dest) else {
            return;
        };
        let encoded = match pkt.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("cannot encode {:?} packet for {}: {}", pkt.pkt_type, dest, e);
                return;
            }
        };
        // Best-effort: a full socket buffer drops the packet, the retry
        // driver covers the loss.
        match self.socket.try_send_to(&encoded, addr) {
            Ok(_) => debug!("sent {:?} packet to {}", pkt.pkt_type, addr),
            Err(e) => debug!("control send to {} dropped: {}", addr, e),
        }
    }
}

/// Control sender that records every handed-off packet instead of sending.
/// Tests pop packets from it to drive the peer's handlers by hand.
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: Mutex<VecDeque<(String, SmPkt)>>,
}

impl RecordingSender {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the oldest recorded packet
    pub fn pop(&self) -> Option<SmPkt> {
        self.pop_with_dest().map(|(_, pkt)| pkt)
    }

    /// Pop the oldest recorded packet together with its destination
    pub fn pop_with_dest(&self) -> Option<(String, SmPkt)> {
        self.sent.lock().expect("recording sender poisoned").pop_front()
    }

    /// Number of recorded packets
    pub fn len(&self) -> usize {
        self.sent.lock().expect("recording sender poisoned").len()
    }

    /// True when nothing has been recorded since the last drain
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all recorded packets
    pub fn clear(&self) {
        self.sent.lock().expect("recording sender poisoned").clear();
    }
}

impl ControlSender for RecordingSender {
    fn send_packet(&self, dest: &str, pkt: &SmPkt) {
        self.sent
            .lock()
            .expect("recording sender poisoned")
            .push_back((dest.to_string(), pkt.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_wire::{RoutingInfo, SessionEndpoint, TransportType};
    use std::time::Duration;

    fn pkt(token: u64) -> SmPkt {
        let ep = SessionEndpoint {
            transport_type: TransportType::InfiniBand,
            hostname: "localhost".to_string(),
            rpc_id: 1,
            phy_port: 0,
            session_num: 0,
            start_seq: 9,
            routing_info: RoutingInfo::default(),
        };
        SmPkt::connect_req(token, ep.clone(), ep)
    }

    #[test]
    fn test_recording_sender_fifo() {
        let sender = RecordingSender::new();
        assert!(sender.is_empty());

        sender.send_packet("peer-a", &pkt(1));
        sender.send_packet("peer-b", &pkt(2));
        assert_eq!(sender.len(), 2);

        let (dest, first) = sender.pop_with_dest().unwrap();
        assert_eq!(dest, "peer-a");
        assert_eq!(first.uniq_token, 1);
        assert_eq!(sender.pop().unwrap().uniq_token, 2);
        assert!(sender.pop().is_none());
    }

    #[tokio::test]
    async fn test_udp_roundtrip() {
        let a = UdpControlTransport::bind(0).await.unwrap();
        let b = UdpControlTransport::bind(0).await.unwrap();

        let sent = pkt(0xAB);
        a.send_packet(&format!("127.0.0.1:{}", b.local_port()), &sent);

        let received = tokio::time::timeout(Duration::from_secs(2), b.recv_packet())
            .await
            .expect("timed out waiting for control packet");
        assert_eq!(received, sent);
    }

    #[tokio::test]
    async fn test_udp_skips_malformed_datagram() {
        let a = UdpControlTransport::bind(0).await.unwrap();
        let b = UdpControlTransport::bind(0).await.unwrap();
        let dest = format!("127.0.0.1:{}", b.local_port());

        // Garbage first, then a valid packet; recv skips the garbage.
        a.socket
            .send_to(b"not a control packet", ("127.0.0.1", b.local_port()))
            .await
            .unwrap();
        let sent = pkt(7);
        a.send_packet(&dest, &sent);

        let received = tokio::time::timeout(Duration::from_secs(2), b.recv_packet())
            .await
            .expect("timed out waiting for control packet");
        assert_eq!(received, sent);
    }
}
