use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::balance::{annotate_balances, BalanceAnnotatedAddress, BalanceSource};
use crate::config::DiscoveryConfig;
use crate::device::{DerivedAddress, DeviceSession, Discovery, DiscoveryRequest, PendingChoice};
use crate::error::{DeviceError, DiscoveryError, ProtocolViolation, Result};
use crate::wallet::ConfirmedAccount;

/// Transient state of one connection attempt
#[derive(Debug, Default)]
struct DiscoveryState {
    fetching: bool,
    /// Position `i` holds the address derived at index `i`
    accounts: Vec<BalanceAnnotatedAddress>,
    pending_choice: PendingChoice,
}

struct AnnotatedBatch {
    accounts: Vec<BalanceAnnotatedAddress>,
    choice: PendingChoice,
    settled: BoxFuture<'static, Result<DerivedAddress, DeviceError>>,
}

/// Mediates between a caller and the device SDK to produce a user-confirmed
/// address.
///
/// All operations take `&self`; the state lock is only held for synchronous
/// transitions, so `pick_account` can be called while `connect` is still
/// waiting for the device operation to settle.
pub struct AccountDiscovery {
    config: DiscoveryConfig,
    device: Arc<dyn DeviceSession>,
    balances: Arc<dyn BalanceSource>,
    state: Mutex<DiscoveryState>,
}

impl AccountDiscovery {
    pub fn new(
        config: DiscoveryConfig,
        device: Arc<dyn DeviceSession>,
        balances: Arc<dyn BalanceSource>,
    ) -> Self {
        Self {
            config,
            device,
            balances,
            state: Mutex::new(DiscoveryState::default()),
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    /// Open a fresh session and discover the first batch.
    ///
    /// Resolves with the address the device operation settles to, which is
    /// the one passed to [`pick_account`](Self::pick_account) unless the
    /// device settles on its own.
    #[instrument(level = "info", skip(self), fields(kind = %self.config.kind, path = %self.config.path))]
    pub async fn connect(&self) -> Result<DerivedAddress> {
        {
            let mut state = self.state.lock().await;
            if state.fetching {
                return Err(ProtocolViolation::FetchInFlight.into());
            }
            *state = DiscoveryState::default();
            state.fetching = true;
        }
        debug!("🔗 Session reset, requesting first batch");

        let batch = match self.discover(0).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!("❌ Connect failed: {}", e);
                self.state.lock().await.fetching = false;
                return Err(e);
            }
        };

        let settled = {
            let mut state = self.state.lock().await;
            state.pending_choice = batch.choice;
            state.accounts = batch.accounts;
            state.fetching = false;
            info!("✅ Connected, {} accounts discovered", state.accounts.len());
            batch.settled
        };

        let address = settled.await?;
        info!("🔓 Device operation settled with {}", address);
        Ok(address)
    }

    /// Fetch page `offset` (in batches) and splice it into the accounts.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch_page(&self, offset: usize) -> Result<Vec<BalanceAnnotatedAddress>> {
        let batch_size = self.config.batch_size;
        let start = {
            let mut state = self.state.lock().await;
            if state.fetching {
                return Err(ProtocolViolation::FetchInFlight.into());
            }
            let loaded = state.accounts.len();
            let start = offset
                .checked_mul(batch_size)
                .filter(|start| *start <= loaded)
                .ok_or(ProtocolViolation::PageOutOfRange { offset, loaded })?;
            state.fetching = true;
            start
        };

        let batch = match self.discover(start).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!("❌ Page {} fetch failed: {}", offset, e);
                self.state.lock().await.fetching = false;
                return Err(e);
            }
        };

        // The page fetch's own paused operation is never resumed
        let AnnotatedBatch { accounts, .. } = batch;

        let mut state = self.state.lock().await;
        // Only the returned window is replaced
        let end = (start + accounts.len()).min(state.accounts.len());
        state.accounts.splice(start..end, accounts.iter().cloned());
        state.fetching = false;
        info!(
            "Fetched page {} ({} accounts), {} loaded",
            offset,
            accounts.len(),
            state.accounts.len()
        );

        Ok(accounts)
    }

    /// Resume the device operation paused by `connect` with `address`.
    #[instrument(level = "info", skip(self))]
    pub async fn pick_account(&self, address: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.pending_choice.ensure_pending()?;

        let chosen = state
            .accounts
            .iter()
            .find(|account| account.address() == address)
            .map(|account| account.address.clone())
            .ok_or_else(|| ProtocolViolation::UnknownAccount(address.to_string()))?;

        state.pending_choice.resume(chosen)?;
        Ok(())
    }

    pub fn confirmed(&self, address: &DerivedAddress) -> ConfirmedAccount {
        ConfirmedAccount::new(address, self.config.kind)
    }

    pub async fn is_fetching(&self) -> bool {
        self.state.lock().await.fetching
    }

    pub async fn accounts(&self) -> Vec<BalanceAnnotatedAddress> {
        self.state.lock().await.accounts.clone()
    }

    pub async fn account_count(&self) -> usize {
        self.state.lock().await.accounts.len()
    }

    pub async fn has_pending_choice(&self) -> bool {
        self.state.lock().await.pending_choice.is_pending()
    }

    async fn discover(&self, start: usize) -> Result<AnnotatedBatch> {
        let offset = u32::try_from(start).map_err(|_| ProtocolViolation::PageOutOfRange {
            offset: start / self.config.batch_size,
            loaded: start,
        })?;
        let request = DiscoveryRequest {
            kind: self.config.kind,
            path: self.config.path.clone(),
            offset,
            count: self.config.batch_size,
        };

        let Discovery {
            addresses,
            choice,
            settled,
        } = self.device.begin_discovery(request).await?;
        debug!("Device returned {} addresses at {}", addresses.len(), start);

        for (expected, address) in (offset..).zip(&addresses) {
            if address.index != expected {
                return Err(DeviceError::MisindexedBatch {
                    expected,
                    got: address.index,
                }
                .into());
            }
        }

        let accounts = annotate_balances(self.balances.as_ref(), addresses)
            .await
            .map_err(DiscoveryError::from)?;

        Ok(AnnotatedBatch {
            accounts,
            choice,
            settled,
        })
    }
}
