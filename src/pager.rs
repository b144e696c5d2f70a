//! Render-free model of the account selection list: five rows per view
//! page, fetching the next device batch when paging past what is loaded.

use std::sync::Arc;

use tracing::debug;

use crate::balance::BalanceAnnotatedAddress;
use crate::discovery::AccountDiscovery;
use crate::error::{ProtocolViolation, Result};

pub const ACCOUNTS_PER_PAGE: usize = 5;

pub struct AccountPager {
    discovery: Arc<AccountDiscovery>,
    page: usize,
    selected: Option<String>,
    /// Account count at which the device last returned a short batch
    exhausted_at: Option<usize>,
}

impl AccountPager {
    pub fn new(discovery: Arc<AccountDiscovery>) -> Self {
        Self {
            discovery,
            page: 0,
            selected: None,
            exhausted_at: None,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn can_go_back(&self) -> bool {
        self.page > 0
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// 1-based number shown next to `row` of the current page
    pub fn display_number(&self, row: usize) -> usize {
        self.page * ACCOUNTS_PER_PAGE + row + 1
    }

    pub async fn visible(&self) -> Vec<BalanceAnnotatedAddress> {
        let accounts = self.discovery.accounts().await;
        let start = (self.page * ACCOUNTS_PER_PAGE).min(accounts.len());
        let end = (start + ACCOUNTS_PER_PAGE).min(accounts.len());
        accounts[start..end].to_vec()
    }

    /// Nothing to show yet, e.g. while the first batch is being discovered.
    pub async fn is_loading(&self) -> bool {
        self.visible().await.is_empty()
    }

    /// Move to `page`, fetching the next batch first if it is not loaded.
    ///
    /// Stays on the current page if the device has no accounts to show
    /// there. Once the device has returned a short batch, paging past the
    /// end does not ask it again. Returns the page now shown.
    pub async fn to_page(&mut self, page: usize) -> Result<usize> {
        if self.discovery.is_fetching().await {
            return Err(ProtocolViolation::FetchInFlight.into());
        }

        let start = page * ACCOUNTS_PER_PAGE;
        let mut loaded = self.discovery.account_count().await;
        if loaded <= start && self.exhausted_at != Some(loaded) {
            let batch_size = self.discovery.batch_size();
            let offset = loaded / batch_size;
            debug!("Page {} not loaded, fetching batch {}", page, offset);
            let fetched = self.discovery.fetch_page(offset).await?;
            loaded = self.discovery.account_count().await;
            if fetched.len() < batch_size {
                debug!("Device ran out of accounts at {}", loaded);
                self.exhausted_at = Some(loaded);
            }
        }

        if loaded > start {
            self.page = page;
        }
        Ok(self.page)
    }

    pub async fn next_page(&mut self) -> Result<usize> {
        self.to_page(self.page + 1).await
    }

    pub async fn prev_page(&mut self) -> Result<usize> {
        if !self.can_go_back() {
            return Err(ProtocolViolation::BeforeFirstPage.into());
        }
        self.to_page(self.page - 1).await
    }

    pub async fn select(&mut self, address: &str) -> Result<()> {
        let known = self
            .discovery
            .accounts()
            .await
            .iter()
            .any(|account| account.address() == address);
        if !known {
            return Err(ProtocolViolation::UnknownAccount(address.to_string()).into());
        }
        self.selected = Some(address.to_string());
        Ok(())
    }

    /// Resume the paused device operation with the selected address.
    pub async fn confirm(&self) -> Result<()> {
        let address = self.selected.as_deref().ok_or(ProtocolViolation::NothingSelected)?;
        self.discovery.pick_account(address).await
    }
}

/// Shorten `text` to its first `head` and last `tail` characters.
pub fn cut_middle(text: &str, head: usize, tail: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= head + tail {
        return text.to_string();
    }
    let start: String = chars[..head].iter().collect();
    let end: String = chars[chars.len() - tail..].iter().collect();
    format!("{}...{}", start, end)
}
