//! Session lifecycle management.
//!
//! One manager per runtime instance owns the session table, the in-flight
//! registry, and all handshake logic. Application calls and inbound control
//! packets are fed in one at a time from a single execution context; the
//! manager performs no internal locking and never blocks. All sends are
//! fire-and-forget handoffs to the control transport, so every handler must
//! stay idempotent under duplication and reordering.

use crate::control::ControlSender;
use crate::inflight::InFlightRegistry;
use crate::registry::EndpointRegistry;
use crate::session::{Session, SessionEvent, SessionRole, SessionState};
use crate::table::SessionTable;
use crate::transport::FabricTransport;
use fabric_wire::{
    RoutingInfo, SessionEndpoint, SmErrType, SmPkt, SmPktType, INVALID_SESSION_NUM,
    MAX_HOSTNAME_LEN, MAX_PHY_PORTS,
};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Tunables for one session manager instance
#[derive(Debug, Clone)]
pub struct SessionManagerConfig {
    /// Upper bound on session table slots
    pub max_sessions: usize,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self { max_sessions: 1024 }
    }
}

/// Control-plane state machine for one runtime instance.
///
/// Generic over the control transport and the fast-path fabric so tests can
/// substitute recording and loopback implementations.
#[derive(Debug)]
pub struct SessionManager<C: ControlSender, F: FabricTransport> {
    registry: EndpointRegistry,
    fabric: F,
    ctrl: C,
    table: SessionTable,
    in_flight: InFlightRegistry,
    // Tokens of connect requests that created a session here. A request
    // whose token is known but whose session is gone gets no reply; the
    // requester's retry logic covers it.
    conn_req_tokens: HashMap<u64, u16>,
    // Last disconnect response per token, resent on duplicated requests
    // after the session itself is gone.
    disconnect_resp_cache: HashMap<u64, SmPkt>,
    event_tx: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl<C: ControlSender, F: FabricTransport> SessionManager<C, F> {
    /// Create a manager with an empty session table
    pub fn new(registry: EndpointRegistry, fabric: F, ctrl: C, config: SessionManagerConfig) -> Self {
        Self {
            registry,
            fabric,
            ctrl,
            table: SessionTable::new(config.max_sessions),
            in_flight: InFlightRegistry::new(),
            conn_req_tokens: HashMap::new(),
            disconnect_resp_cache: HashMap::new(),
            event_tx: None,
        }
    }

    /// Register a channel for session state-transition notifications
    pub fn set_event_sender(&mut self, tx: mpsc::UnboundedSender<SessionEvent>) {
        self.event_tx = Some(tx);
    }

    /// Borrow a live session by number
    pub fn session(&self, session_num: u16) -> Option<&Session> {
        self.table.get(session_num)
    }

    /// Number of live sessions in the table
    pub fn session_count(&self) -> usize {
        self.table.live_count()
    }

    /// True while the session has an unacknowledged control request
    pub fn is_in_flight(&self, session_num: u16) -> bool {
        self.in_flight.contains(session_num)
    }

    /// Session numbers of all live client-role sessions
    pub fn live_client_sessions(&self) -> Vec<u16> {
        self.table
            .iter_live()
            .filter(|(_, s)| s.is_client())
            .map(|(sn, _)| sn)
            .collect()
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }

    /// Open a client-role session to a remote endpoint.
    ///
    /// Validates every argument eagerly and returns `None` with a logged
    /// diagnostic on any failure; nothing is mutated in that case. On
    /// success the session enters `ConnectInProgress`, is registered as
    /// in-flight, and a connect request is handed to the control transport.
    pub fn create_session(
        &mut self,
        local_port: u8,
        remote_hostname: &str,
        remote_rpc_id: u64,
        remote_port: u8,
    ) -> Option<u16> {
        if !self.fabric.is_port_managed(local_port) {
            warn!("create_session: local port {} is not managed", local_port);
            return None;
        }
        if remote_port >= MAX_PHY_PORTS {
            warn!("create_session: remote port {} out of range", remote_port);
            return None;
        }
        if remote_hostname.is_empty() || remote_hostname.len() > MAX_HOSTNAME_LEN {
            warn!(
                "create_session: invalid remote hostname length {}",
                remote_hostname.len()
            );
            return None;
        }
        if remote_hostname == self.registry.hostname() && remote_rpc_id == self.registry.rpc_id() {
            warn!("create_session: cannot connect to own endpoint");
            return None;
        }
        if let Some(existing) = self.table.find_session_to(remote_hostname, remote_rpc_id) {
            warn!(
                "create_session: session {} to {}/{} already exists",
                existing, remote_hostname, remote_rpc_id
            );
            return None;
        }
        let Some(session_num) = self.table.reserve() else {
            warn!("create_session: session table is full");
            return None;
        };

        let client = SessionEndpoint {
            transport_type: self.fabric.transport_type(),
            hostname: self.registry.hostname().to_string(),
            rpc_id: self.registry.rpc_id(),
            phy_port: local_port,
            session_num,
            start_seq: rand::random(),
            routing_info: self.fabric.fill_routing_info(local_port),
        };
        let server = SessionEndpoint {
            transport_type: self.fabric.transport_type(),
            hostname: remote_hostname.to_string(),
            rpc_id: remote_rpc_id,
            phy_port: remote_port,
            session_num: INVALID_SESSION_NUM,
            start_seq: 0,
            routing_info: RoutingInfo::default(),
        };

        let pkt = SmPkt::connect_req(rand::random(), client.clone(), server.clone());
        self.table.install(
            session_num,
            Session::new(SessionRole::Client, SessionState::ConnectInProgress, client, server),
        );
        self.in_flight.insert(session_num, pkt.clone());
        self.ctrl.send_packet(&pkt.server.hostname, &pkt);

        info!(
            "session {}: connecting to {}/{}",
            session_num, remote_hostname, remote_rpc_id
        );
        Some(session_num)
    }

    /// Release a client-role session.
    ///
    /// Dispatches on the current state: an in-progress connect is abandoned
    /// and superseded by a disconnect, a connected session starts
    /// disconnecting, a session already disconnecting is left alone, and a
    /// terminal session is released immediately without network I/O.
    /// Unknown or server-role session numbers are usage errors and are
    /// logged without effect.
    pub fn destroy_session(&mut self, session_num: u16) {
        let Some(session) = self.table.get(session_num) else {
            error!("destroy_session: no session {}", session_num);
            return;
        };
        if !session.is_client() {
            error!("destroy_session: session {} is not client-role", session_num);
            return;
        }

        match session.state {
            SessionState::ConnectInProgress => {
                // Abandon the pending connect; a late response is detected
                // by the state check and discarded.
                self.in_flight.remove(session_num);
                self.begin_disconnect(session_num);
            }
            SessionState::Connected => {
                self.begin_disconnect(session_num);
            }
            SessionState::DisconnectInProgress => {
                debug!("destroy_session: session {} already disconnecting", session_num);
            }
            SessionState::Disconnected | SessionState::Error => {
                self.table.remove(session_num);
                debug!("destroy_session: released terminal session {}", session_num);
            }
        }
    }

    fn begin_disconnect(&mut self, session_num: u16) {
        let (client, server) = {
            let session = match self.table.get_mut(session_num) {
                Some(s) => s,
                None => return,
            };
            session.state = SessionState::DisconnectInProgress;
            (session.client.clone(), session.server.clone())
        };

        let pkt = SmPkt::disconnect_req(rand::random(), client, server);
        self.in_flight.insert(session_num, pkt.clone());
        self.ctrl.send_packet(&pkt.server.hostname, &pkt);
        info!("session {}: disconnecting", session_num);
    }

    /// Dispatch one inbound control packet to its handler
    pub fn process_packet(&mut self, pkt: SmPkt) {
        match pkt.pkt_type {
            SmPktType::ConnectReq => self.handle_connect_req(pkt),
            SmPktType::ConnectResp => self.handle_connect_resp(pkt),
            SmPktType::DisconnectReq => self.handle_disconnect_req(pkt),
            SmPktType::DisconnectResp => self.handle_disconnect_resp(pkt),
        }
    }

    /// Accept or reject an inbound connect request.
    ///
    /// Idempotent: a duplicated request for a live session resends the
    /// original response without creating state, and a request whose token
    /// belongs to an already-destroyed session is dropped without a reply.
    fn handle_connect_req(&mut self, pkt: SmPkt) {
        // Duplicate of a live session: rebuild and resend the response.
        if let Some(session_num) = self.table.find_server_session_for(&pkt.client) {
            let session = self
                .table
                .get(session_num)
                .map(|s| (s.client.clone(), s.server.clone()));
            if let Some((client, server)) = session {
                debug!(
                    "connect request duplicate for session {}, resending response",
                    session_num
                );
                let resp = SmPkt::connect_resp(SmErrType::NoError, pkt.uniq_token, client, server);
                self.ctrl.send_packet(&resp.client.hostname, &resp);
            }
            return;
        }

        // The token was seen before but the session is gone: the slot was
        // emptied by a disconnect, so there is nothing to match against.
        if self.conn_req_tokens.contains_key(&pkt.uniq_token) {
            debug!(
                "connect request token {:#x} refers to a destroyed session, dropping",
                pkt.uniq_token
            );
            return;
        }

        let requested_port = pkt.server.phy_port;
        if requested_port >= MAX_PHY_PORTS || !self.fabric.is_port_managed(requested_port) {
            warn!(
                "connect request from {} rejected: port {} not managed",
                pkt.client.label(),
                requested_port
            );
            let resp = SmPkt::connect_resp(
                SmErrType::InvalidRemotePort,
                pkt.uniq_token,
                pkt.client,
                pkt.server,
            );
            self.ctrl.send_packet(&resp.client.hostname, &resp);
            return;
        }

        let Some(session_num) = self.table.reserve() else {
            warn!(
                "connect request from {} rejected: session table full",
                pkt.client.label()
            );
            let resp = SmPkt::connect_resp(
                SmErrType::TooManySessions,
                pkt.uniq_token,
                pkt.client,
                pkt.server,
            );
            self.ctrl.send_packet(&resp.client.hostname, &resp);
            return;
        };

        let server = SessionEndpoint {
            transport_type: self.fabric.transport_type(),
            hostname: self.registry.hostname().to_string(),
            rpc_id: self.registry.rpc_id(),
            phy_port: requested_port,
            session_num,
            start_seq: rand::random(),
            routing_info: self.fabric.fill_routing_info(requested_port),
        };
        self.table.install(
            session_num,
            Session::new(
                SessionRole::Server,
                SessionState::Connected,
                pkt.client.clone(),
                server.clone(),
            ),
        );
        self.conn_req_tokens.insert(pkt.uniq_token, session_num);

        info!(
            "session {}: accepted connect from {}",
            session_num,
            pkt.client.label()
        );
        let resp = SmPkt::connect_resp(SmErrType::NoError, pkt.uniq_token, pkt.client, server);
        self.ctrl.send_packet(&resp.client.hostname, &resp);
    }

    /// Complete or fail a pending client-side connect.
    ///
    /// Responses for unknown sessions, sessions no longer connecting, or
    /// mismatched identities are late or stray duplicates and are discarded.
    fn handle_connect_resp(&mut self, pkt: SmPkt) {
        let session_num = pkt.client.session_num;
        let Some(session) = self.table.get_mut(session_num) else {
            debug!("connect response for unknown session {}, dropping", session_num);
            return;
        };
        if !session.is_client()
            || session.state != SessionState::ConnectInProgress
            || !session.client.same_identity(&pkt.client)
        {
            debug!("stale connect response for session {}, dropping", session_num);
            return;
        }

        let event = if pkt.err_type == SmErrType::NoError {
            session.server = pkt.server;
            session.state = SessionState::Connected;
            info!("session {}: connected", session_num);
            SessionEvent::Connected { session_num }
        } else {
            session.state = SessionState::Error;
            warn!(
                "session {}: connect rejected by peer: {:?}",
                session_num, pkt.err_type
            );
            SessionEvent::ConnectFailed {
                session_num,
                err: pkt.err_type,
            }
        };

        self.in_flight.remove(session_num);
        self.emit(event);
    }

    /// Tear down a server-role session on the client's request.
    ///
    /// Idempotent: a duplicated request after teardown resends the cached
    /// response; an unmatchable request without a cached response is
    /// dropped and the client's retry eventually gives up.
    fn handle_disconnect_req(&mut self, pkt: SmPkt) {
        if let Some(session_num) = self.table.find_server_session_for(&pkt.client) {
            let Some(session) = self.table.remove(session_num) else {
                return;
            };
            info!(
                "session {}: disconnected on request from {}",
                session_num,
                pkt.client.label()
            );
            let resp = SmPkt::disconnect_resp(
                SmErrType::NoError,
                pkt.uniq_token,
                pkt.client,
                session.server,
            );
            self.disconnect_resp_cache.insert(pkt.uniq_token, resp.clone());
            self.ctrl.send_packet(&resp.client.hostname, &resp);
            return;
        }

        if let Some(cached) = self.disconnect_resp_cache.get(&pkt.uniq_token) {
            debug!(
                "disconnect request duplicate (token {:#x}), resending cached response",
                pkt.uniq_token
            );
            let resp = cached.clone();
            self.ctrl.send_packet(&resp.client.hostname, &resp);
            return;
        }

        debug!(
            "disconnect request from {} matches no session, dropping",
            pkt.client.label()
        );
    }

    /// Finish a pending client-side disconnect and release the session
    fn handle_disconnect_resp(&mut self, pkt: SmPkt) {
        let session_num = pkt.client.session_num;
        let Some(session) = self.table.get_mut(session_num) else {
            debug!("disconnect response for unknown session {}, dropping", session_num);
            return;
        };
        if !session.is_client()
            || session.state != SessionState::DisconnectInProgress
            || !session.client.same_identity(&pkt.client)
        {
            debug!("stale disconnect response for session {}, dropping", session_num);
            return;
        }

        session.state = SessionState::Disconnected;
        self.in_flight.remove(session_num);
        self.table.remove(session_num);
        info!("session {}: disconnected", session_num);
        self.emit(SessionEvent::Disconnected { session_num });
    }

    /// Resend the outstanding request for one in-flight session
    pub fn retransmit(&self, session_num: u16) -> bool {
        match self.in_flight.get(session_num) {
            Some(pkt) => {
                debug!("session {}: retransmitting {:?}", session_num, pkt.pkt_type);
                self.ctrl.send_packet(&pkt.server.hostname, pkt);
                true
            }
            None => false,
        }
    }

    /// Resend every outstanding request; returns how many were resent
    pub fn retransmit_all(&self) -> usize {
        let mut resent = 0;
        for (session_num, pkt) in self.in_flight.iter() {
            debug!("session {}: retransmitting {:?}", session_num, pkt.pkt_type);
            self.ctrl.send_packet(&pkt.server.hostname, pkt);
            resent += 1;
        }
        resent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::RecordingSender;
    use crate::transport::LoopbackFabric;
    use std::sync::Arc;

    type TestManager = SessionManager<Arc<RecordingSender>, LoopbackFabric>;

    fn manager(hostname: &str, rpc_id: u64, max_sessions: usize) -> (TestManager, Arc<RecordingSender>) {
        let sender = Arc::new(RecordingSender::new());
        let mgr = SessionManager::new(
            EndpointRegistry::new(hostname, rpc_id),
            LoopbackFabric::default(),
            Arc::clone(&sender),
            SessionManagerConfig { max_sessions },
        );
        (mgr, sender)
    }

    #[test]
    fn test_create_session_validations() {
        let (mut mgr, sender) = manager("local", 1, 4);

        // Unmanaged local port
        assert_eq!(mgr.create_session(5, "remote", 2, 0), None);
        // Remote port out of range
        assert_eq!(mgr.create_session(0, "remote", 2, MAX_PHY_PORTS), None);
        // Empty remote hostname
        assert_eq!(mgr.create_session(0, "", 2, 0), None);
        // Oversized remote hostname
        let long = "h".repeat(MAX_HOSTNAME_LEN + 1);
        assert_eq!(mgr.create_session(0, &long, 2, 0), None);
        // Own endpoint
        assert_eq!(mgr.create_session(0, "local", 1, 0), None);

        assert_eq!(mgr.session_count(), 0);
        assert!(sender.is_empty());
    }

    #[test]
    fn test_create_session_sends_connect_req() {
        let (mut mgr, sender) = manager("local", 1, 4);

        let sn = mgr.create_session(0, "remote", 2, 0).unwrap();
        assert_eq!(sn, 0);
        assert_eq!(mgr.session_count(), 1);
        assert!(mgr.is_in_flight(sn));

        let session = mgr.session(sn).unwrap();
        assert_eq!(session.state, SessionState::ConnectInProgress);
        assert!(session.is_client());
        assert_eq!(session.client.session_num, sn);
        assert_eq!(session.server.session_num, INVALID_SESSION_NUM);

        let (dest, pkt) = sender.pop_with_dest().unwrap();
        assert_eq!(dest, "remote");
        assert_eq!(pkt.pkt_type, SmPktType::ConnectReq);
        assert_eq!(pkt.client.hostname, "local");
        assert_eq!(pkt.server.hostname, "remote");
        assert_eq!(pkt.server.rpc_id, 2);
        assert!(sender.is_empty());
    }

    #[test]
    fn test_duplicate_client_rejected() {
        let (mut mgr, sender) = manager("local", 1, 4);

        assert!(mgr.create_session(0, "remote", 2, 0).is_some());
        sender.clear();

        assert_eq!(mgr.create_session(0, "remote", 2, 0), None);
        assert_eq!(mgr.session_count(), 1);
        assert!(sender.is_empty());

        // Same hostname, different runtime id is a different endpoint
        assert!(mgr.create_session(0, "remote", 3, 0).is_some());
        assert_eq!(mgr.session_count(), 2);
    }

    #[test]
    fn test_capacity_bound() {
        let (mut mgr, _sender) = manager("local", 1, 2);

        assert!(mgr.create_session(0, "a", 2, 0).is_some());
        assert!(mgr.create_session(0, "b", 3, 0).is_some());
        assert_eq!(mgr.create_session(0, "c", 4, 0), None);
        assert_eq!(mgr.session_count(), 2);
    }

    #[test]
    fn test_handle_connect_req_idempotent() {
        let (mut client, client_sender) = manager("client-host", 1, 4);
        let (mut server, server_sender) = manager("server-host", 2, 4);

        client.create_session(0, "server-host", 2, 0).unwrap();
        let req = client_sender.pop().unwrap();

        server.process_packet(req.clone());
        assert_eq!(server.session_count(), 1);
        let first = server_sender.pop().unwrap();
        assert_eq!(first.pkt_type, SmPktType::ConnectResp);
        assert_eq!(first.err_type, SmErrType::NoError);
        let assigned = first.server.session_num;

        // Replaying the identical request creates no state and resends a
        // response with the same error type and session number.
        server.process_packet(req);
        assert_eq!(server.session_count(), 1);
        let second = server_sender.pop().unwrap();
        assert_eq!(second.err_type, SmErrType::NoError);
        assert_eq!(second.server.session_num, assigned);
        assert!(server_sender.is_empty());
    }

    #[test]
    fn test_stale_slot_gets_no_response() {
        let (mut client, client_sender) = manager("client-host", 1, 4);
        let (mut server, server_sender) = manager("server-host", 2, 4);

        let sn = client.create_session(0, "server-host", 2, 0).unwrap();
        let connect_req = client_sender.pop().unwrap();
        server.process_packet(connect_req.clone());
        client.process_packet(server_sender.pop().unwrap());

        // Tear the server-side session down.
        client.destroy_session(sn);
        server.process_packet(client_sender.pop().unwrap());
        assert_eq!(server.session_count(), 0);
        server_sender.clear();

        // A late duplicate of the original connect request must neither
        // create a session nor produce a reply.
        server.process_packet(connect_req);
        assert_eq!(server.session_count(), 0);
        assert!(server_sender.is_empty());
    }

    #[test]
    fn test_connect_req_invalid_port() {
        let (mut client, client_sender) = manager("client-host", 1, 4);
        let (mut server, server_sender) = manager("server-host", 2, 4);

        client.create_session(0, "server-host", 2, 3).unwrap();
        let req = client_sender.pop().unwrap();

        // Loopback fabric manages only port 0.
        server.process_packet(req);
        assert_eq!(server.session_count(), 0);
        let resp = server_sender.pop().unwrap();
        assert_eq!(resp.pkt_type, SmPktType::ConnectResp);
        assert_eq!(resp.err_type, SmErrType::InvalidRemotePort);
    }

    #[test]
    fn test_connect_req_capacity_exhausted() {
        let (mut client, client_sender) = manager("client-host", 1, 4);
        let (mut server, server_sender) = manager("server-host", 2, 0);

        client.create_session(0, "server-host", 2, 0).unwrap();
        server.process_packet(client_sender.pop().unwrap());

        assert_eq!(server.session_count(), 0);
        let resp = server_sender.pop().unwrap();
        assert_eq!(resp.err_type, SmErrType::TooManySessions);
    }

    #[test]
    fn test_connect_resp_error_moves_session_to_error() {
        let (mut client, client_sender) = manager("client-host", 1, 4);
        let (mut server, server_sender) = manager("server-host", 2, 0);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        client.set_event_sender(event_tx);

        let sn = client.create_session(0, "server-host", 2, 0).unwrap();
        server.process_packet(client_sender.pop().unwrap());
        client.process_packet(server_sender.pop().unwrap());

        assert_eq!(client.session(sn).unwrap().state, SessionState::Error);
        assert!(!client.is_in_flight(sn));
        assert_eq!(
            event_rx.try_recv().unwrap(),
            SessionEvent::ConnectFailed {
                session_num: sn,
                err: SmErrType::TooManySessions,
            }
        );

        // Terminal sessions release without network I/O.
        client_sender.clear();
        client.destroy_session(sn);
        assert_eq!(client.session_count(), 0);
        assert!(client_sender.is_empty());
    }

    #[test]
    fn test_late_connect_resp_discarded() {
        let (mut client, client_sender) = manager("client-host", 1, 4);
        let (mut server, server_sender) = manager("server-host", 2, 4);

        let sn = client.create_session(0, "server-host", 2, 0).unwrap();
        server.process_packet(client_sender.pop().unwrap());
        let resp = server_sender.pop().unwrap();

        // Abandon the connect before the response lands.
        client.destroy_session(sn);
        assert_eq!(
            client.session(sn).unwrap().state,
            SessionState::DisconnectInProgress
        );

        client.process_packet(resp);
        assert_eq!(
            client.session(sn).unwrap().state,
            SessionState::DisconnectInProgress
        );
    }

    #[test]
    fn test_destroy_idempotent() {
        let (mut client, client_sender) = manager("client-host", 1, 4);
        let (mut server, server_sender) = manager("server-host", 2, 4);

        let sn = client.create_session(0, "server-host", 2, 0).unwrap();
        server.process_packet(client_sender.pop().unwrap());
        client.process_packet(server_sender.pop().unwrap());
        assert_eq!(client.session(sn).unwrap().state, SessionState::Connected);

        client.destroy_session(sn);
        client.destroy_session(sn);

        let req = client_sender.pop().unwrap();
        assert_eq!(req.pkt_type, SmPktType::DisconnectReq);
        assert!(client_sender.is_empty());
    }

    #[test]
    fn test_duplicate_disconnect_req_resends_cached_resp() {
        let (mut client, client_sender) = manager("client-host", 1, 4);
        let (mut server, server_sender) = manager("server-host", 2, 4);

        let sn = client.create_session(0, "server-host", 2, 0).unwrap();
        server.process_packet(client_sender.pop().unwrap());
        client.process_packet(server_sender.pop().unwrap());

        client.destroy_session(sn);
        let disconnect_req = client_sender.pop().unwrap();

        server.process_packet(disconnect_req.clone());
        let first = server_sender.pop().unwrap();
        assert_eq!(first.pkt_type, SmPktType::DisconnectResp);
        assert_eq!(server.session_count(), 0);

        server.process_packet(disconnect_req);
        let second = server_sender.pop().unwrap();
        assert_eq!(first, second);
        assert_eq!(server.session_count(), 0);
    }

    #[test]
    fn test_retransmit_resends_same_request() {
        let (mut mgr, sender) = manager("local", 1, 4);

        let sn = mgr.create_session(0, "remote", 2, 0).unwrap();
        let original = sender.pop().unwrap();

        assert_eq!(mgr.retransmit_all(), 1);
        let resent = sender.pop().unwrap();
        assert_eq!(original, resent);
        assert_eq!(original.uniq_token, resent.uniq_token);

        assert!(mgr.retransmit(sn));
        assert!(!mgr.retransmit(sn + 1));
    }

    #[test]
    fn test_full_session_lifecycle() {
        let (mut client, client_sender) = manager("client-host", 1, 4);
        let (mut server, server_sender) = manager("server-host", 2, 4);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        client.set_event_sender(event_tx);

        // Connect handshake.
        let sn = client.create_session(0, "server-host", 2, 0).unwrap();
        assert_eq!(client.session_count(), 1);

        server.process_packet(client_sender.pop().unwrap());
        assert_eq!(server.session_count(), 1);

        client.process_packet(server_sender.pop().unwrap());
        let session = client.session(sn).unwrap();
        assert_eq!(session.state, SessionState::Connected);
        assert_ne!(session.server.session_num, INVALID_SESSION_NUM);
        assert!(!session.server.routing_info.is_empty());
        assert!(!client.is_in_flight(sn));
        assert_eq!(
            event_rx.try_recv().unwrap(),
            SessionEvent::Connected { session_num: sn }
        );

        // Disconnect handshake.
        client.destroy_session(sn);
        assert!(client.is_in_flight(sn));

        server.process_packet(client_sender.pop().unwrap());
        assert_eq!(server.session_count(), 0);

        client.process_packet(server_sender.pop().unwrap());
        assert_eq!(client.session_count(), 0);
        assert!(!client.is_in_flight(sn));
        assert_eq!(
            event_rx.try_recv().unwrap(),
            SessionEvent::Disconnected { session_num: sn }
        );

        // Freed slot is reusable for a fresh session.
        assert_eq!(client.create_session(0, "server-host", 2, 0), Some(sn));
    }
}
