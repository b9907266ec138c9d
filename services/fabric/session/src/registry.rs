//! Local endpoint identity.

/// Resolves this runtime instance's own hostname and runtime identifier.
/// Read-only from the session subsystem's perspective.
#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    hostname: String,
    rpc_id: u64,
}

impl EndpointRegistry {
    /// Record the local identity
    pub fn new(hostname: impl Into<String>, rpc_id: u64) -> Self {
        Self {
            hostname: hostname.into(),
            rpc_id,
        }
    }

    /// This instance's hostname
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// This instance's runtime identifier
    pub fn rpc_id(&self) -> u64 {
        self.rpc_id
    }
}
