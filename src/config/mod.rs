//! Session configuration
//!
//! Environment-first with an optional TOML file override. Only endpoints,
//! identifiers, and timeouts live here; API keys stay in the environment
//! and are read by the HTTP clients directly.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::core::error::{PilotError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PilotConfig {
    /// Workspace the orchestrator plans against.
    pub workspace_id: String,
    /// Conversation id passed to the analytics backend.
    pub chat_id: String,
    /// How long the router waits for the intent oracle.
    pub oracle_timeout_ms: u64,
    /// How long orchestration waits for a sheet refresh acknowledgement.
    pub signal_timeout_ms: u64,
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            workspace_id: "default".to_string(),
            chat_id: "local".to_string(),
            oracle_timeout_ms: 10_000,
            signal_timeout_ms: 15_000,
        }
    }
}

impl PilotConfig {
    /// Defaults overridden by SHEETPILOT_* environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(workspace_id) = std::env::var("SHEETPILOT_WORKSPACE_ID") {
            config.workspace_id = workspace_id;
        }
        if let Ok(chat_id) = std::env::var("SHEETPILOT_CHAT_ID") {
            config.chat_id = chat_id;
        }
        if let Ok(ms) = std::env::var("SHEETPILOT_ORACLE_TIMEOUT_MS") {
            if let Ok(ms) = ms.parse() {
                config.oracle_timeout_ms = ms;
            }
        }
        if let Ok(ms) = std::env::var("SHEETPILOT_SIGNAL_TIMEOUT_MS") {
            if let Ok(ms) = ms.parse() {
                config.signal_timeout_ms = ms;
            }
        }
        config
    }

    /// Load from a TOML file; missing keys fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| PilotError::Validation(format!("invalid config: {e}")))
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }

    pub fn signal_timeout(&self) -> Duration {
        Duration::from_millis(self.signal_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PilotConfig::default();
        assert_eq!(config.oracle_timeout(), Duration::from_secs(10));
        assert_eq!(config.signal_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: PilotConfig = toml::from_str("workspace_id = \"ws-42\"").unwrap();
        assert_eq!(config.workspace_id, "ws-42");
        assert_eq!(config.chat_id, "local");
        assert_eq!(config.signal_timeout_ms, 15_000);
    }
}
