//! Bounded, stably-indexed session table.
//!
//! Sessions live in an arena of optional slots addressed by session number.
//! Destroying a session empties its slot; other indices never shift, because
//! session numbers are exchanged with peers during the handshake. An emptied
//! slot may be reused by a later session.

use crate::session::{Session, SessionRole};
use fabric_wire::SessionEndpoint;

/// Arena of sessions owned by one runtime instance
#[derive(Debug)]
pub struct SessionTable {
    slots: Vec<Option<Session>>,
    max_sessions: usize,
}

impl SessionTable {
    /// Create an empty table bounded at `max_sessions` slots
    pub fn new(max_sessions: usize) -> Self {
        Self {
            slots: Vec::new(),
            max_sessions,
        }
    }

    /// Reserve a slot: the lowest emptied slot if any, else a new one while
    /// below the configured maximum. Returns `None` when the table is full.
    pub fn reserve(&mut self) -> Option<u16> {
        if let Some(idx) = self.slots.iter().position(Option::is_none) {
            return Some(idx as u16);
        }
        if self.slots.len() < self.max_sessions {
            self.slots.push(None);
            return Some((self.slots.len() - 1) as u16);
        }
        None
    }

    /// Install a session into a reserved slot. The session's locally-owned
    /// session number must equal the slot index.
    pub fn install(&mut self, session_num: u16, session: Session) {
        debug_assert_eq!(session.local_session_num(), session_num);
        let slot = &mut self.slots[session_num as usize];
        debug_assert!(slot.is_none());
        *slot = Some(session);
    }

    /// Borrow a live session by number
    pub fn get(&self, session_num: u16) -> Option<&Session> {
        self.slots.get(session_num as usize)?.as_ref()
    }

    /// Mutably borrow a live session by number
    pub fn get_mut(&mut self, session_num: u16) -> Option<&mut Session> {
        self.slots.get_mut(session_num as usize)?.as_mut()
    }

    /// Empty a slot, returning the destroyed session. Indices never shift.
    pub fn remove(&mut self, session_num: u16) -> Option<Session> {
        self.slots.get_mut(session_num as usize)?.take()
    }

    /// Number of slots ever allocated (live and emptied)
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no slot has ever been allocated
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of live sessions
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Iterate over live sessions with their session numbers
    pub fn iter_live(&self) -> impl Iterator<Item = (u16, &Session)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|s| (idx as u16, s)))
    }

    /// Find the session whose server metadata points at the given remote
    /// endpoint. Used to enforce at most one client-role session per remote.
    pub fn find_session_to(&self, hostname: &str, rpc_id: u64) -> Option<u16> {
        self.iter_live()
            .find(|(_, s)| s.server.hostname == hostname && s.server.rpc_id == rpc_id)
            .map(|(sn, _)| sn)
    }

    /// Find the live server-role session whose recorded client metadata
    /// exactly matches the given endpoint identity.
    pub fn find_server_session_for(&self, client: &SessionEndpoint) -> Option<u16> {
        self.iter_live()
            .find(|(_, s)| s.role == SessionRole::Server && s.client.same_identity(client))
            .map(|(sn, _)| sn)
    }
}
