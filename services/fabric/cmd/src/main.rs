//! Fabric RPC runtime node binary.
//!
//! Runs one runtime instance: binds the UDP session-management socket,
//! opens sessions to the requested remote endpoints, and drives the
//! connect/disconnect handshakes with periodic retransmission of
//! unacknowledged control requests.

use clap::Parser;
use fabric_session::{
    EndpointRegistry, LoopbackFabric, SessionEvent, SessionManager, SessionManagerConfig,
    UdpControlTransport,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::RuntimeConfig;

/// Fabric RPC runtime node
#[derive(Parser, Debug)]
#[command(name = "fabric-rpc", version, about = "Fabric RPC runtime node")]
struct Args {
    /// Hostname other endpoints use to reach this instance
    #[arg(long)]
    hostname: Option<String>,

    /// Runtime identifier, unique per instance on a host
    #[arg(long)]
    rpc_id: Option<u64>,

    /// UDP port for session-management packets
    #[arg(long)]
    sm_port: Option<u16>,

    /// Maximum number of concurrent sessions
    #[arg(long)]
    max_sessions: Option<usize>,

    /// Remote endpoint to connect to, e.g. node-2/1 or node-2/1/0 (repeatable)
    #[arg(long)]
    connect: Vec<String>,

    /// Local fabric port used for outgoing sessions
    #[arg(long, default_value = "0")]
    local_port: u8,

    /// Retransmission interval for unacknowledged control requests
    #[arg(long, default_value = "200ms")]
    retry_interval: humantime::Duration,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Configuration file path
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

/// Parse a `hostname/rpc_id` or `hostname/rpc_id/phy_port` connect spec
fn parse_connect_spec(spec: &str) -> anyhow::Result<(String, u64, u8)> {
    let mut parts = spec.split('/');
    let hostname = parts
        .next()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| anyhow::anyhow!("connect spec {:?} is missing a hostname", spec))?;
    let rpc_id = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("connect spec {:?} is missing a runtime id", spec))?
        .parse::<u64>()
        .map_err(|e| anyhow::anyhow!("connect spec {:?} has a bad runtime id: {}", spec, e))?;
    let phy_port = match parts.next() {
        Some(p) => p
            .parse::<u8>()
            .map_err(|e| anyhow::anyhow!("connect spec {:?} has a bad port: {}", spec, e))?,
        None => 0,
    };
    if parts.next().is_some() {
        anyhow::bail!("connect spec {:?} has trailing components", spec);
    }
    Ok((hostname.to_string(), rpc_id, phy_port))
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::new("info")
        .add_directive(format!("fabric_session={}", args.log_level).parse()?)
        .add_directive(format!("fabric_wire={}", args.log_level).parse()?)
        .add_directive(format!("fabric_rpc={}", args.log_level).parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    info!("Starting fabric RPC node v{}", env!("CARGO_PKG_VERSION"));

    let mut runtime_config = RuntimeConfig::load_from_file(&args.config)?;
    if let Some(hostname) = args.hostname {
        runtime_config.hostname = hostname;
    }
    if let Some(rpc_id) = args.rpc_id {
        runtime_config.rpc_id = rpc_id;
    }
    if let Some(sm_port) = args.sm_port {
        runtime_config.sm_port = sm_port;
    }
    if let Some(max_sessions) = args.max_sessions {
        runtime_config.max_sessions = max_sessions;
    }

    info!(
        "Node identity: {}/{}, sm_port={}, max_sessions={}",
        runtime_config.hostname,
        runtime_config.rpc_id,
        runtime_config.sm_port,
        runtime_config.max_sessions
    );

    let ctrl = Arc::new(UdpControlTransport::bind(runtime_config.sm_port).await?);
    info!("Session-management socket bound on port {}", ctrl.local_port());

    let registry = EndpointRegistry::new(runtime_config.hostname.clone(), runtime_config.rpc_id);
    let mut manager = SessionManager::new(
        registry,
        LoopbackFabric::default(),
        Arc::clone(&ctrl),
        SessionManagerConfig {
            max_sessions: runtime_config.max_sessions,
        },
    );

    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<SessionEvent>();
    manager.set_event_sender(event_tx);

    for spec in &args.connect {
        let (hostname, rpc_id, phy_port) = parse_connect_spec(spec)?;
        info!("Opening session to {}/{} port {}", hostname, rpc_id, phy_port);
        if manager
            .create_session(args.local_port, &hostname, rpc_id, phy_port)
            .is_none()
        {
            warn!("Failed to open session to {}", spec);
        }
    }

    let retry_interval = Duration::from(args.retry_interval);
    let mut retry = tokio::time::interval(retry_interval);
    retry.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    info!("Fabric node started. Waiting for control packets...");

    loop {
        tokio::select! {
            pkt = ctrl.recv_packet() => {
                manager.process_packet(pkt);
            }

            _ = retry.tick() => {
                let resent = manager.retransmit_all();
                if resent > 0 {
                    debug!("Retransmitted {} outstanding control requests", resent);
                }
            }

            Some(event) = event_rx.recv() => {
                match event {
                    SessionEvent::Connected { session_num } => {
                        info!("Session {} connected", session_num);
                    }
                    SessionEvent::ConnectFailed { session_num, err } => {
                        warn!("Session {} connect failed: {:?}", session_num, err);
                    }
                    SessionEvent::Disconnected { session_num } => {
                        info!("Session {} disconnected", session_num);
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received interrupt, disconnecting sessions");
                break;
            }
        }
    }

    // Graceful shutdown: tear down client sessions and give the disconnect
    // handshakes a few retry rounds to complete.
    for session_num in manager.live_client_sessions() {
        manager.destroy_session(session_num);
    }

    let deadline = tokio::time::Instant::now() + 5 * retry_interval;
    while manager.session_count() > 0 {
        tokio::select! {
            pkt = ctrl.recv_packet() => {
                manager.process_packet(pkt);
            }
            _ = retry.tick() => {
                manager.retransmit_all();
            }
            _ = tokio::time::sleep_until(deadline) => {
                warn!("Shutdown drain timed out with {} sessions remaining", manager.session_count());
                break;
            }
        }
    }

    info!("Fabric node shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connect_spec() {
        assert_eq!(
            parse_connect_spec("node-2/1").unwrap(),
            ("node-2".to_string(), 1, 0)
        );
        assert_eq!(
            parse_connect_spec("node-2/1/3").unwrap(),
            ("node-2".to_string(), 1, 3)
        );

        assert!(parse_connect_spec("node-2").is_err());
        assert!(parse_connect_spec("/1").is_err());
        assert!(parse_connect_spec("node-2/x").is_err());
        assert!(parse_connect_spec("node-2/1/0/9").is_err());
    }
}
