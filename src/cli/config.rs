// CLI Configuration - Convert CLI args to executor config
// Principle: Clear mapping between user input and internal configuration

use crate::cli::Cli;
use crate::config::{ConfigError, ExecutorConfig};
use crate::types::AccountId;
use ed25519_dalek::SigningKey;
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything a command needs besides its own arguments
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Base data path
    pub base_path: PathBuf,
    pub executor: ExecutorConfig,
}

impl RunConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let executor = match &cli.config {
            Some(path) => {
                info!("Loading executor config from {}", path.display());
                ExecutorConfig::from_file(path)?
            }
            None => ExecutorConfig::default(),
        };
        Ok(Self {
            base_path: cli.get_base_path(),
            executor,
        })
    }

    /// RocksDB directory holding the snapshots
    pub fn db_path(&self) -> PathBuf {
        self.base_path.join("db")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("Failed to read key file: {0}")]
    Io(String),

    #[error("Invalid hex: {0}")]
    Hex(String),

    #[error("Invalid key length: {0} bytes (expected 32)")]
    Length(usize),

    #[error("Key file missing 'secretKey' field")]
    MissingSecret,
}

fn key_bytes(hex_str: &str) -> Result<[u8; 32], KeyError> {
    let hex_str = hex_str.trim();
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    let bytes = hex::decode(hex_str).map_err(|e| KeyError::Hex(e.to_string()))?;
    bytes.as_slice().try_into().map_err(|_| KeyError::Length(bytes.len()))
}

/// Secret key from a hex string
pub fn parse_secret(hex_str: &str) -> Result<SigningKey, KeyError> {
    Ok(SigningKey::from_bytes(&key_bytes(hex_str)?))
}

/// Load a signing key: JSON from `key generate` or raw hex
pub fn load_signing_key(path: &Path) -> Result<SigningKey, KeyError> {
    let content = std::fs::read_to_string(path).map_err(|e| KeyError::Io(e.to_string()))?;

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(&content) {
        let secret = json
            .get("secretKey")
            .and_then(|v| v.as_str())
            .ok_or(KeyError::MissingSecret)?;
        return parse_secret(secret);
    }
    parse_secret(&content)
}

/// Account from a key file, or from an `Mx`/hex address
pub fn resolve_account(value: &str) -> Result<AccountId, KeyError> {
    let path = Path::new(value);
    if path.exists() {
        let key = load_signing_key(path)?;
        return Ok(AccountId::from_public_key(&key.verifying_key()));
    }
    value.parse::<AccountId>().map_err(|e| KeyError::Hex(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    #[test]
    fn test_run_config_defaults() {
        let cli = Cli::try_parse_from(["agora-exec", "inspect"]).unwrap();
        let config = RunConfig::from_cli(&cli).unwrap();
        assert_eq!(config.executor, ExecutorConfig::default());
        assert_eq!(config.db_path(), PathBuf::from("agora-data").join("db"));
    }

    #[test]
    fn test_load_key_json_and_hex() {
        let dir = tempdir().unwrap();
        let secret = hex::encode([9u8; 32]);

        let json_path = dir.path().join("key.json");
        std::fs::write(&json_path, format!(r#"{{"secretKey":"0x{}"}}"#, secret)).unwrap();
        let hex_path = dir.path().join("key.hex");
        std::fs::write(&hex_path, format!("{}\n", secret)).unwrap();

        let a = load_signing_key(&json_path).unwrap();
        let b = load_signing_key(&hex_path).unwrap();
        assert_eq!(a.to_bytes(), b.to_bytes());

        let account = resolve_account(json_path.to_str().unwrap()).unwrap();
        assert_eq!(account, AccountId::from_public_key(&a.verifying_key()));
    }

    #[test]
    fn test_bad_key_length() {
        assert!(matches!(parse_secret("abcd"), Err(KeyError::Length(2))));
        assert!(matches!(parse_secret("zz"), Err(KeyError::Hex(_))));
    }

    #[test]
    fn test_resolve_address() {
        let address = AccountId::from_bytes([3u8; 32]);
        assert_eq!(resolve_account(&address.to_hex()).unwrap(), address);
    }
}
