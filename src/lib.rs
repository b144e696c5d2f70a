//! Core, headless hardware-wallet account discovery – no UI code.
//!
//! [`AccountDiscovery`] connects to a Ledger or Trezor through a
//! [`DeviceSession`], pages through the addresses it derives, annotates each
//! with a balance from a [`BalanceSource`], and resumes the paused device
//! operation once the user picks an address.

pub mod balance;
pub mod config;
pub mod device;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod pager;
pub mod path;
pub mod simulator;
pub mod wallet;

pub use balance::{annotate_balances, Balance, BalanceAnnotatedAddress, BalanceSource};
pub use config::{DiscoveryConfig, DEFAULT_BATCH_SIZE};
pub use device::{DerivedAddress, DeviceSession, Discovery, DiscoveryRequest, PendingChoice};
pub use discovery::AccountDiscovery;
pub use error::{BalanceError, ConfigError, DeviceError, DiscoveryError, ProtocolViolation};
pub use pager::{cut_middle, AccountPager, ACCOUNTS_PER_PAGE};
pub use path::DerivationPath;
pub use wallet::{ConfirmedAccount, LedgerPathKind, WalletKind};
