//! In-process stand-ins for the device SDK and the balance lookup.
//!
//! Addresses and balances are derived deterministically from the path and
//! index, so the same session always discovers the same accounts.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use sha2::{Digest, Sha256};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info};

use crate::balance::{Balance, BalanceSource};
use crate::device::{DerivedAddress, DeviceSession, Discovery, DiscoveryRequest, PendingChoice};
use crate::error::{BalanceError, DeviceError};
use crate::path::{hardened, DerivationPath};

const BIP44_PURPOSE: u32 = hardened(44);
const WEI_PER_STEP: u128 = 10_000_000_000_000_000; // 0.01

/// Deterministic address for `index` below `path`.
pub fn simulated_address(path: &DerivationPath, index: u32) -> String {
    let digest = Sha256::digest(path.child(index).to_string().as_bytes());
    format!("0x{}", hex::encode(&digest[12..]))
}

/// Fake hardware wallet.
///
/// Every discovery pauses until its [`PendingChoice`] is resumed, unless
/// `auto_settle` is set, in which case it settles at once with the first
/// address of the batch.
#[derive(Default)]
pub struct SimulatedDevice {
    auto_settle: bool,
    /// Limit on how many addresses the device will derive in total
    max_accounts: Option<u32>,
    failures: Mutex<VecDeque<DeviceError>>,
    requests: Mutex<Vec<DiscoveryRequest>>,
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_settle(mut self) -> Self {
        self.auto_settle = true;
        self
    }

    pub fn with_max_accounts(mut self, max: u32) -> Self {
        self.max_accounts = Some(max);
        self
    }

    /// Queue a failure for the next discovery call.
    pub async fn fail_next(&self, error: DeviceError) {
        self.failures.lock().await.push_back(error);
    }

    pub async fn requests(&self) -> Vec<DiscoveryRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl DeviceSession for SimulatedDevice {
    async fn begin_discovery(&self, request: DiscoveryRequest) -> Result<Discovery, DeviceError> {
        self.requests.lock().await.push(request.clone());

        if let Some(error) = self.failures.lock().await.pop_front() {
            debug!("Simulated device failing with {}", error);
            return Err(error);
        }

        if request.path.components().first() != Some(&BIP44_PURPOSE) {
            return Err(DeviceError::UnsupportedPath(request.path.to_string()));
        }

        let end = request.offset.saturating_add(request.count as u32);
        let end = self.max_accounts.map_or(end, |max| end.min(max));
        let addresses: Vec<DerivedAddress> = (request.offset..end)
            .map(|index| DerivedAddress::new(index, simulated_address(&request.path, index)))
            .collect();
        info!(
            "Simulated {} derived {} addresses from {} at {}",
            request.kind,
            addresses.len(),
            request.path,
            request.offset
        );

        let (tx, rx) = oneshot::channel();
        let choice = PendingChoice::new(move |address| {
            let _ = tx.send(address);
        });

        let settled: BoxFuture<'static, Result<DerivedAddress, DeviceError>> = match addresses.first() {
            Some(first) if self.auto_settle => futures::future::ready(Ok(first.clone())).boxed(),
            _ => async move { rx.await.map_err(|_| DeviceError::Disconnected) }.boxed(),
        };

        Ok(Discovery {
            addresses,
            choice,
            settled,
        })
    }
}

/// Fake chain-state lookup.
#[derive(Default)]
pub struct SimulatedBalances {
    overrides: HashMap<String, Balance>,
    failing: HashSet<String>,
    latency: Option<Duration>,
}

impl SimulatedBalances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(mut self, address: impl Into<String>, balance: Balance) -> Self {
        self.overrides.insert(address.into(), balance);
        self
    }

    pub fn failing_for(mut self, address: impl Into<String>) -> Self {
        self.failing.insert(address.into());
        self
    }

    /// Each lookup sleeps between a quarter of and the full `latency`,
    /// so lookups of one batch complete out of order.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn derived_balance(address: &str) -> Balance {
        let digest = Sha256::digest(address.as_bytes());
        Balance::from_wei(digest[0] as u128 * WEI_PER_STEP)
    }
}

#[async_trait]
impl BalanceSource for SimulatedBalances {
    async fn get_balance(&self, address: &DerivedAddress) -> Result<Balance, BalanceError> {
        let key = address.address.as_str();
        if let Some(latency) = self.latency {
            let quarters = (Sha256::digest(key.as_bytes())[1] % 4 + 1) as u32;
            tokio::time::sleep(latency * quarters / 4).await;
        }

        if self.failing.contains(key) {
            return Err(BalanceError::new(key, "simulated network failure"));
        }

        Ok(self
            .overrides
            .get(key)
            .copied()
            .unwrap_or_else(|| Self::derived_balance(key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::{LedgerPathKind, WalletKind};

    fn request(offset: u32, count: usize) -> DiscoveryRequest {
        DiscoveryRequest {
            kind: WalletKind::Ledger,
            path: LedgerPathKind::Live.path(),
            offset,
            count,
        }
    }

    #[test]
    fn test_simulated_address_is_deterministic() {
        let path = LedgerPathKind::Live.path();
        let a = simulated_address(&path, 0);
        assert_eq!(a, simulated_address(&path, 0));
        assert_ne!(a, simulated_address(&path, 1));
        assert_eq!(a.len(), 42);
        assert!(a.starts_with("0x"));
    }

    #[tokio::test]
    async fn test_device_respects_max_accounts() {
        let device = SimulatedDevice::new().with_max_accounts(30);
        let discovery = device.begin_discovery(request(25, 25)).await.unwrap();
        let indices: Vec<u32> = discovery.addresses.iter().map(|a| a.index).collect();
        assert_eq!(indices, (25..30).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn test_device_rejects_non_bip44_path() {
        let device = SimulatedDevice::new();
        let mut bad = request(0, 5);
        bad.path = "m/49'/0'/0'".parse().unwrap();
        let err = device.begin_discovery(bad).await.unwrap_err();
        assert!(matches!(err, DeviceError::UnsupportedPath(_)));
    }

    #[tokio::test]
    async fn test_settles_after_choice() {
        let device = SimulatedDevice::new();
        let Discovery {
            addresses,
            mut choice,
            settled,
        } = device.begin_discovery(request(0, 3)).await.unwrap();
        choice.resume(addresses[1].clone()).unwrap();
        assert_eq!(settled.await.unwrap(), addresses[1]);
    }

    #[tokio::test]
    async fn test_dropped_choice_disconnects() {
        let device = SimulatedDevice::new();
        let discovery = device.begin_discovery(request(0, 3)).await.unwrap();
        drop(discovery.choice);
        assert_eq!(discovery.settled.await.unwrap_err(), DeviceError::Disconnected);
    }

    #[tokio::test]
    async fn test_balance_overrides_and_failures() {
        let balances = SimulatedBalances::new()
            .with_balance("0xaa", Balance::from_wei(7))
            .failing_for("0xbb");
        let aa = DerivedAddress::new(0, "0xaa");
        let bb = DerivedAddress::new(1, "0xbb");
        assert_eq!(balances.get_balance(&aa).await.unwrap(), Balance::from_wei(7));
        assert!(balances.get_balance(&bb).await.is_err());
    }
}
