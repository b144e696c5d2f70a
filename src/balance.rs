use std::fmt;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::device::DerivedAddress;
use crate::error::BalanceError;

const NATIVE_DECIMALS: u32 = 18;

/// Native currency amount in its smallest unit (wei).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Balance(pub u128);

impl Balance {
    pub fn from_wei(wei: u128) -> Self {
        Self(wei)
    }

    pub fn wei(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = 10u128.pow(NATIVE_DECIMALS);
        let whole = self.0 / unit;
        let frac = self.0 % unit;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:0width$}", frac, width = NATIVE_DECIMALS as usize);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAnnotatedAddress {
    pub address: DerivedAddress,
    pub balance: Balance,
}

impl BalanceAnnotatedAddress {
    pub fn address(&self) -> &str {
        &self.address.address
    }

    pub fn index(&self) -> u32 {
        self.address.index
    }
}

/// Chain-state query returning the native balance of an address.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn get_balance(&self, address: &DerivedAddress) -> Result<Balance, BalanceError>;
}

/// Look up every balance of a batch concurrently.
///
/// Output order matches `addresses` whatever order the lookups finish in.
/// The first failing lookup fails the whole batch.
pub async fn annotate_balances(
    source: &dyn BalanceSource,
    addresses: Vec<DerivedAddress>,
) -> Result<Vec<BalanceAnnotatedAddress>, BalanceError> {
    let balances = try_join_all(addresses.iter().map(|address| source.get_balance(address))).await?;
    debug!("Annotated {} addresses with balances", balances.len());

    Ok(addresses
        .into_iter()
        .zip(balances)
        .map(|(address, balance)| BalanceAnnotatedAddress { address, balance })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_balance_display() {
        assert_eq!(Balance::from_wei(0).to_string(), "0");
        assert_eq!(Balance::from_wei(2_000_000_000_000_000_000).to_string(), "2");
        assert_eq!(Balance::from_wei(1_500_000_000_000_000_000).to_string(), "1.5");
        assert_eq!(Balance::from_wei(1).to_string(), "0.000000000000000001");
    }

    #[tokio::test]
    async fn test_annotate_preserves_order() {
        let mut source = MockBalanceSource::new();
        source
            .expect_get_balance()
            .times(3)
            .returning(|address| Ok(Balance::from_wei(address.index as u128 * 10)));

        let addresses = (0..3)
            .map(|i| DerivedAddress::new(i, format!("0x{:040x}", i)))
            .collect::<Vec<_>>();
        let annotated = annotate_balances(&source, addresses.clone()).await.unwrap();

        assert_eq!(annotated.len(), 3);
        for (i, entry) in annotated.iter().enumerate() {
            assert_eq!(entry.address, addresses[i]);
            assert_eq!(entry.balance.wei(), i as u128 * 10);
        }
    }

    #[tokio::test]
    async fn test_annotate_fails_whole_batch() {
        let mut source = MockBalanceSource::new();
        source.expect_get_balance().returning(|address| {
            if address.index == 1 {
                Err(BalanceError::new(address.address.clone(), "network unreachable"))
            } else {
                Ok(Balance::default())
            }
        });

        let addresses = (0..3).map(|i| DerivedAddress::new(i, format!("addr{}", i))).collect();
        let err = annotate_balances(&source, addresses).await.unwrap_err();
        assert_eq!(err.address, "addr1");
    }

    struct SlowFirst;

    #[async_trait]
    impl BalanceSource for SlowFirst {
        async fn get_balance(&self, address: &DerivedAddress) -> Result<Balance, BalanceError> {
            // Earlier indices finish last
            let delay = 30u64.saturating_sub(address.index as u64 * 10);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(Balance::from_wei(address.index as u128))
        }
    }

    #[tokio::test]
    async fn test_annotate_order_independent_of_completion() {
        let addresses = (0..4).map(|i| DerivedAddress::new(i, format!("addr{}", i))).collect();
        let annotated = annotate_balances(&SlowFirst, addresses).await.unwrap();
        let indices: Vec<u32> = annotated.iter().map(|a| a.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }
}
