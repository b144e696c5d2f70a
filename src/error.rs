use thiserror::Error;

/// Failures reported by the hardware device or its SDK.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("No hardware device found")]
    NotFound,
    #[error("Request was rejected on the device")]
    UserRejected,
    #[error("Derivation path not supported by device: {0}")]
    UnsupportedPath(String),
    #[error("Device disconnected before the operation settled")]
    Disconnected,
    #[error("Device returned index {got} where {expected} was requested")]
    MisindexedBatch { expected: u32, got: u32 },
    #[error("Device error: {0}")]
    Other(String),
}

/// A balance lookup failed while enriching a batch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Balance lookup failed for {address}: {reason}")]
pub struct BalanceError {
    pub address: String,
    pub reason: String,
}

impl BalanceError {
    pub fn new(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            reason: reason.into(),
        }
    }
}

/// Caller contract breaches. These are never retried or recovered from.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("A discovery fetch is already in flight")]
    FetchInFlight,
    #[error("No device operation is waiting for an account choice")]
    NoPendingChoice,
    #[error("The pending account choice was already consumed")]
    ChoiceAlreadyConsumed,
    #[error("Page {offset} does not follow the {loaded} loaded accounts")]
    PageOutOfRange { offset: usize, loaded: usize },
    #[error("Address {0} was not discovered in this session")]
    UnknownAccount(String),
    #[error("No account selected")]
    NothingSelected,
    #[error("Cannot page before the first page")]
    BeforeFirstPage,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Balance(#[from] BalanceError),
    #[error("Protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid derivation path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
    #[error("Batch size must be at least 1")]
    InvalidBatchSize,
    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = DiscoveryError> = std::result::Result<T, E>;
