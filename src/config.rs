// Config - Executor configuration and protocol upgrades
use crate::types::{BlockNumber, ChainId, MAX_TX_LENGTH};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Rule set in force at a given height. Each version keeps its own
/// decode/execute behaviour for replaying history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProtocolVersion {
    /// Curve-only swaps, no limit orders, no failure fee
    V1,
    /// Limit orders, order-aware pricing, failure fee
    V2,
}

impl ProtocolVersion {
    pub fn has_orders(self) -> bool {
        self >= ProtocolVersion::V2
    }

    pub fn charges_failure_fee(self) -> bool {
        self >= ProtocolVersion::V2
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProtocolVersion::V1 => write!(f, "v1"),
            ProtocolVersion::V2 => write!(f, "v2"),
        }
    }
}

/// Heights at which protocol versions activate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upgrades {
    pub v2_height: BlockNumber,
}

impl Upgrades {
    pub fn version_at(&self, height: BlockNumber) -> ProtocolVersion {
        if height >= self.v2_height {
            ProtocolVersion::V2
        } else {
            ProtocolVersion::V1
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub chain_id: ChainId,
    /// Mempool floor for `gas_price`
    pub min_gas_price: u64,
    pub max_tx_length: usize,
    pub upgrades: Upgrades,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            chain_id: ChainId::TESTNET,
            min_gas_price: 1,
            max_tx_length: MAX_TX_LENGTH,
            upgrades: Upgrades::default(),
        }
    }
}

impl ExecutorConfig {
    pub fn version_at(&self, height: BlockNumber) -> ProtocolVersion {
        self.upgrades.version_at(height)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.display().to_string(), e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::Io(path.display().to_string(), e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot access {0}: {1}")]
    Io(String, String),

    #[error("invalid configuration: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_switch() {
        let upgrades = Upgrades { v2_height: 100 };
        assert_eq!(upgrades.version_at(99), ProtocolVersion::V1);
        assert_eq!(upgrades.version_at(100), ProtocolVersion::V2);
        assert!(!ProtocolVersion::V1.has_orders());
        assert!(ProtocolVersion::V2.charges_failure_fee());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ExecutorConfig = serde_json::from_str(r#"{"chain_id": 1}"#).unwrap();
        assert_eq!(config.chain_id, ChainId::MAINNET);
        assert_eq!(config.min_gas_price, 1);
        assert_eq!(config.upgrades.v2_height, 0);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("executor.json");
        let config = ExecutorConfig {
            min_gas_price: 5,
            upgrades: Upgrades { v2_height: 42 },
            ..ExecutorConfig::default()
        };
        config.to_file(&path).unwrap();
        assert_eq!(ExecutorConfig::from_file(&path).unwrap(), config);
    }
}
