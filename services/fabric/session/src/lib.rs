//! Session-management control plane for the fabric RPC runtime.
//!
//! Sessions are named bidirectional channels between two RPC endpoints.
//! This crate owns their lifecycle: the state machine, the bounded session
//! table, the idempotent connect/disconnect handshake over an unreliable
//! control transport, and the in-flight bookkeeping that drives
//! retransmission. The data path over the fast fabric transport is an
//! external collaborator reached through the [`FabricTransport`] trait.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod control;
pub mod inflight;
pub mod manager;
pub mod registry;
pub mod session;
pub mod table;
pub mod transport;

pub use control::{ControlSender, RecordingSender, UdpControlTransport};
pub use inflight::InFlightRegistry;
pub use manager::{SessionManager, SessionManagerConfig};
pub use registry::EndpointRegistry;
pub use session::{Session, SessionEvent, SessionRole, SessionState};
pub use table::SessionTable;
pub use transport::{FabricTransport, LoopbackFabric};
