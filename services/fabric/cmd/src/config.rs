//! Configuration handling for the fabric RPC runtime.
//!
//! Settings come from an optional YAML file, overridden by `FABRIC_*`
//! environment variables, overridden in turn by command-line flags.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Runtime instance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Hostname other endpoints use to reach this instance
    pub hostname: String,
    /// Runtime identifier, unique per instance on a host
    pub rpc_id: u64,
    /// UDP port for session-management packets
    pub sm_port: u16,
    /// Upper bound on concurrent sessions
    pub max_sessions: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            rpc_id: 0,
            sm_port: 31850,
            max_sessions: 1024,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a YAML file and apply environment overrides
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config = Self::default();

        if let Ok(content) = std::fs::read_to_string(&config_path) {
            match serde_yaml::from_str::<RuntimeConfig>(&content) {
                Ok(parsed) => {
                    config = parsed;
                    info!("Loaded configuration from {:?}", config_path.as_ref());
                }
                Err(e) => {
                    warn!(
                        "Failed to parse config file {:?}: {}, using defaults",
                        config_path.as_ref(),
                        e
                    );
                }
            }
        } else {
            warn!(
                "Config file {:?} not found, using defaults",
                config_path.as_ref()
            );
        }

        config.apply_environment_overrides();
        Ok(config)
    }

    /// Apply `FABRIC_*` environment variable overrides
    pub fn apply_environment_overrides(&mut self) {
        if let Ok(hostname) = std::env::var("FABRIC_HOSTNAME") {
            info!("Hostname overridden by environment: {}", hostname);
            self.hostname = hostname;
        }
        if let Ok(rpc_id) = std::env::var("FABRIC_RPC_ID") {
            if let Ok(id) = rpc_id.parse::<u64>() {
                info!("Runtime id overridden by environment: {}", id);
                self.rpc_id = id;
            }
        }
        if let Ok(sm_port) = std::env::var("FABRIC_SM_PORT") {
            if let Ok(port) = sm_port.parse::<u16>() {
                info!("Session-management port overridden by environment: {}", port);
                self.sm_port = port;
            }
        }
        if let Ok(max_sessions) = std::env::var("FABRIC_MAX_SESSIONS") {
            if let Ok(max) = max_sessions.parse::<usize>() {
                info!("Session limit overridden by environment: {}", max);
                self.max_sessions = max;
            }
        }
    }
}
