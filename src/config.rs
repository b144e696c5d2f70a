use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::path::DerivationPath;
use crate::wallet::{LedgerPathKind, WalletKind};

/// Number of addresses requested from the device per round-trip
pub const DEFAULT_BATCH_SIZE: usize = 25;

/// Fixed parameters of one discovery controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryConfig {
    pub kind: WalletKind,
    pub path: DerivationPath,
    pub batch_size: usize,
}

#[derive(Deserialize)]
struct RawConfig {
    kind: WalletKind,
    path: Option<DerivationPath>,
    batch_size: Option<usize>,
}

impl DiscoveryConfig {
    pub fn new(kind: WalletKind, path: DerivationPath, batch_size: usize) -> Result<Self, ConfigError> {
        if batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        Ok(Self { kind, path, batch_size })
    }

    pub fn trezor() -> Self {
        Self {
            kind: WalletKind::Trezor,
            path: WalletKind::Trezor.default_path(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn ledger(layout: LedgerPathKind) -> Self {
        Self {
            kind: WalletKind::Ledger,
            path: layout.path(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(self, batch_size: usize) -> Result<Self, ConfigError> {
        Self::new(self.kind, self.path, batch_size)
    }

    /// Parse `{ "kind": "ledger", "path": "44'/60'/0'", "batch_size": 25 }`.
    /// `path` falls back to the wallet's fixed path, `batch_size` to 25.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(json)?;
        let path = raw.path.unwrap_or_else(|| raw.kind.default_path());
        Self::new(raw.kind, path, raw.batch_size.unwrap_or(DEFAULT_BATCH_SIZE))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_defaults() {
        let config = DiscoveryConfig::from_json(r#"{ "kind": "trezor" }"#).unwrap();
        assert_eq!(config, DiscoveryConfig::trezor());
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_from_json_explicit() {
        let config = DiscoveryConfig::from_json(
            r#"{ "kind": "ledger", "path": "44'/60'/0'/0", "batch_size": 10 }"#,
        )
        .unwrap();
        assert_eq!(config.kind, WalletKind::Ledger);
        assert_eq!(config.path, LedgerPathKind::Legacy.path());
        assert_eq!(config.batch_size, 10);
    }

    #[test]
    fn test_rejects_zero_batch_and_bad_path() {
        assert!(matches!(
            DiscoveryConfig::from_json(r#"{ "kind": "ledger", "batch_size": 0 }"#),
            Err(ConfigError::InvalidBatchSize)
        ));
        assert!(matches!(
            DiscoveryConfig::from_json(r#"{ "kind": "ledger", "path": "44'/zz" }"#),
            Err(ConfigError::Json(_))
        ));
    }
}
