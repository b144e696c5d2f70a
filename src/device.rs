//! Boundary to the hardware wallet SDK.
//!
//! The SDK owns the device handshake and address derivation. A discovery
//! call answers with a batch of addresses and then stays paused until the
//! [`PendingChoice`] it handed out is resumed with the chosen address.

use std::fmt;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DeviceError, ProtocolViolation};
use crate::path::DerivationPath;
use crate::wallet::WalletKind;

/// Address derived at `index` along the session's derivation path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DerivedAddress {
    pub index: u32,
    pub address: String,
}

impl DerivedAddress {
    pub fn new(index: u32, address: impl Into<String>) -> Self {
        Self {
            index,
            address: address.into(),
        }
    }
}

impl fmt::Display for DerivedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRequest {
    pub kind: WalletKind,
    pub path: DerivationPath,
    pub offset: u32,
    pub count: usize,
}

type ResumeFn = Box<dyn FnOnce(DerivedAddress) + Send>;

/// One-shot handle to a device operation paused on an account choice.
pub struct PendingChoice {
    resume: Option<ResumeFn>,
    consumed: bool,
}

impl PendingChoice {
    pub fn new(resume: impl FnOnce(DerivedAddress) + Send + 'static) -> Self {
        Self {
            resume: Some(Box::new(resume)),
            consumed: false,
        }
    }

    /// Placeholder used before any device operation has paused.
    pub fn noop() -> Self {
        Self {
            resume: None,
            consumed: false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.resume.is_some()
    }

    /// Fails with the reason a `resume` would be refused.
    pub fn ensure_pending(&self) -> Result<(), ProtocolViolation> {
        match (&self.resume, self.consumed) {
            (Some(_), _) => Ok(()),
            (None, true) => Err(ProtocolViolation::ChoiceAlreadyConsumed),
            (None, false) => Err(ProtocolViolation::NoPendingChoice),
        }
    }

    pub fn resume(&mut self, address: DerivedAddress) -> Result<(), ProtocolViolation> {
        self.ensure_pending()?;
        if let Some(resume) = self.resume.take() {
            debug!("Resuming paused device operation with {}", address);
            self.consumed = true;
            resume(address);
        }
        Ok(())
    }
}

impl Default for PendingChoice {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for PendingChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingChoice")
            .field("pending", &self.is_pending())
            .field("consumed", &self.consumed)
            .finish()
    }
}

/// Result of a discovery call once the device has produced its batch.
pub struct Discovery {
    pub addresses: Vec<DerivedAddress>,
    pub choice: PendingChoice,
    /// Completes when the paused operation settles, normally after `choice`
    /// has been resumed.
    pub settled: BoxFuture<'static, Result<DerivedAddress, DeviceError>>,
}

impl fmt::Debug for Discovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Discovery")
            .field("addresses", &self.addresses)
            .field("choice", &self.choice)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait DeviceSession: Send + Sync {
    /// Derive `request.count` addresses starting at `request.offset`.
    /// Suspends until the device has confirmed the request.
    async fn begin_discovery(&self, request: DiscoveryRequest) -> Result<Discovery, DeviceError>;
}
