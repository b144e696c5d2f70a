use std::fmt;

use serde::{Deserialize, Serialize};

use crate::device::DerivedAddress;
use crate::path::{hardened, DerivationPath};

/// `m/44'/60'/0'`, the Ethereum account level
const ETH_ACCOUNT: [u32; 3] = [hardened(44), hardened(60), hardened(0)];

fn eth_path(suffix: &[u32]) -> DerivationPath {
    DerivationPath::new(ETH_ACCOUNT.iter().chain(suffix).copied().collect())
}

/// Hardware wallet families supported by the discovery flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    Ledger,
    Trezor,
}

impl WalletKind {
    /// Path used when the caller does not pick one. Ledger defaults to Live.
    pub fn default_path(&self) -> DerivationPath {
        match self {
            WalletKind::Ledger => LedgerPathKind::Live.path(),
            WalletKind::Trezor => eth_path(&[0, 0]),
        }
    }
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletKind::Ledger => write!(f, "ledger"),
            WalletKind::Trezor => write!(f, "trezor"),
        }
    }
}

/// Ledger derivation layouts offered to the user before connecting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerPathKind {
    Live,
    Legacy,
}

impl LedgerPathKind {
    pub fn path(&self) -> DerivationPath {
        match self {
            LedgerPathKind::Live => eth_path(&[]),
            LedgerPathKind::Legacy => eth_path(&[0]),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            LedgerPathKind::Live => "Ledger live",
            LedgerPathKind::Legacy => "Ledger legacy",
        }
    }

    /// Template shown next to the choice, `x` being the account index.
    pub fn template(&self) -> &'static str {
        match self {
            LedgerPathKind::Live => "m/44'/60'/0'/x",
            LedgerPathKind::Legacy => "m/44'/60'/0'/0/x",
        }
    }
}

/// Final outcome of a discovery flow, handed to whoever opened it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedAccount {
    pub address: String,
    pub kind: WalletKind,
}

impl ConfirmedAccount {
    pub fn new(address: &DerivedAddress, kind: WalletKind) -> Self {
        Self {
            address: address.address.clone(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_paths() {
        assert_eq!(WalletKind::Trezor.default_path().to_string(), "m/44'/60'/0'/0/0");
        assert_eq!(LedgerPathKind::Live.path().to_string(), "m/44'/60'/0'");
        assert_eq!(LedgerPathKind::Legacy.path().to_string(), "m/44'/60'/0'/0");
        assert_eq!(WalletKind::Ledger.default_path(), LedgerPathKind::Live.path());
        assert_eq!(
            WalletKind::Trezor.default_path(),
            "44'/60'/0'/0/0".parse::<DerivationPath>().unwrap()
        );
    }

    #[test]
    fn test_templates_follow_derived_paths() {
        for kind in [LedgerPathKind::Live, LedgerPathKind::Legacy] {
            let template = kind.template();
            let prefix = template.strip_suffix("/x").unwrap();
            assert_eq!(prefix, kind.path().to_string(), "{}", kind.title());
            assert_eq!(
                kind.path().child(3).to_string(),
                template.replace('x', "3"),
                "{}",
                kind.title()
            );
        }
    }

    #[test]
    fn test_kind_serde() {
        assert_eq!(serde_json::to_string(&WalletKind::Ledger).unwrap(), "\"ledger\"");
        let kind: WalletKind = serde_json::from_str("\"trezor\"").unwrap();
        assert_eq!(kind, WalletKind::Trezor);
    }
}
