//! In-flight control request bookkeeping.
//!
//! A session is in-flight while exactly one control request is outstanding
//! and unacknowledged, which is the case iff its state is
//! `ConnectInProgress` or `DisconnectInProgress`. The registry retains the
//! last request packet per session so the external retry driver can resend
//! it without rebuilding any state.

use fabric_wire::SmPkt;
use std::collections::HashMap;

/// Sessions with one outstanding, unacknowledged control request
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    pending: HashMap<u16, SmPkt>,
}

impl InFlightRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session's outstanding request, replacing any superseded one
    pub fn insert(&mut self, session_num: u16, pkt: SmPkt) {
        self.pending.insert(session_num, pkt);
    }

    /// Deregister a session; returns the request that was outstanding
    pub fn remove(&mut self, session_num: u16) -> Option<SmPkt> {
        self.pending.remove(&session_num)
    }

    /// True while the session has an outstanding request
    pub fn contains(&self, session_num: u16) -> bool {
        self.pending.contains_key(&session_num)
    }

    /// Borrow the outstanding request for resending
    pub fn get(&self, session_num: u16) -> Option<&SmPkt> {
        self.pending.get(&session_num)
    }

    /// Iterate over all outstanding requests
    pub fn iter(&self) -> impl Iterator<Item = (u16, &SmPkt)> {
        self.pending.iter().map(|(sn, pkt)| (*sn, pkt))
    }

    /// Number of in-flight sessions
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when no request is outstanding
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_wire::{RoutingInfo, SessionEndpoint, SmPkt, TransportType};

    fn pkt(token: u64) -> SmPkt {
        let ep = SessionEndpoint {
            transport_type: TransportType::InfiniBand,
            hostname: "h".to_string(),
            rpc_id: 0,
            phy_port: 0,
            session_num: 0,
            start_seq: 0,
            routing_info: RoutingInfo::default(),
        };
        SmPkt::connect_req(token, ep.clone(), ep)
    }

    #[test]
    fn test_insert_remove() {
        let mut reg = InFlightRegistry::new();
        assert!(reg.is_empty());

        reg.insert(3, pkt(1));
        assert!(reg.contains(3));
        assert_eq!(reg.get(3).unwrap().uniq_token, 1);

        // A superseding request replaces the outstanding one
        reg.insert(3, pkt(2));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(3).unwrap().uniq_token, 2);

        let removed = reg.remove(3).unwrap();
        assert_eq!(removed.uniq_token, 2);
        assert!(!reg.contains(3));
        assert!(reg.remove(3).is_none());
    }
}
