//! Session entity and lifecycle states.

use fabric_wire::{SessionEndpoint, SmErrType};
use std::fmt;

/// Role a session plays at this endpoint, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    /// This runtime initiated the session
    Client,
    /// This runtime accepted the session
    Server,
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connect request sent, response outstanding (client only)
    ConnectInProgress,
    /// Handshake complete on both sides
    Connected,
    /// Disconnect request sent, response outstanding (client only)
    DisconnectInProgress,
    /// Torn down cleanly; the peer holds no residual state
    Disconnected,
    /// Peer rejected the handshake; the peer holds no residual state
    Error,
}

impl SessionState {
    /// Terminal states permit releasing the session without network I/O
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Disconnected | SessionState::Error)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::ConnectInProgress => "connect-in-progress",
            SessionState::Connected => "connected",
            SessionState::DisconnectInProgress => "disconnect-in-progress",
            SessionState::Disconnected => "disconnected",
            SessionState::Error => "error",
        };
        f.write_str(s)
    }
}

/// One endpoint-pair relationship, owned exclusively by the session table
#[derive(Debug, Clone)]
pub struct Session {
    /// Role at this endpoint
    pub role: SessionRole,
    /// Current lifecycle state
    pub state: SessionState,
    /// Client-side endpoint metadata
    pub client: SessionEndpoint,
    /// Server-side endpoint metadata (partial until handshake completes)
    pub server: SessionEndpoint,
}

impl Session {
    /// Create a session; the caller fills both endpoints
    pub fn new(
        role: SessionRole,
        state: SessionState,
        client: SessionEndpoint,
        server: SessionEndpoint,
    ) -> Self {
        Self {
            role,
            state,
            client,
            server,
        }
    }

    /// True for client-role sessions
    pub fn is_client(&self) -> bool {
        self.role == SessionRole::Client
    }

    /// Session number in the local table
    pub fn local_session_num(&self) -> u16 {
        match self.role {
            SessionRole::Client => self.client.session_num,
            SessionRole::Server => self.server.session_num,
        }
    }

    /// True once the session may be released without network interaction
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// State-transition notifications surfaced to the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A client session completed its handshake
    Connected {
        /// Local session number
        session_num: u16,
    },
    /// The peer rejected a connect request
    ConnectFailed {
        /// Local session number
        session_num: u16,
        /// Error code from the response
        err: SmErrType,
    },
    /// A client session finished disconnecting and was released
    Disconnected {
        /// Local session number
        session_num: u16,
    },
}
