//! Error handling for the ledger
//!
//! Every fallible operation in the crate returns [`Result`], carrying one of the
//! [`LedgerError`] variants below.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The persistent store could not be opened, read or written
    StoreUnavailable(String),
    /// `init` was called where a ledger already lives
    LedgerAlreadyExists(String),
    /// `open` was called where no ledger lives
    LedgerNotFound(String),
    /// The sender's derived balance is below the requested amount
    InsufficientFunds { required: u64, available: u64 },
    /// A transaction was rejected on append
    InvalidTransaction(String),
    /// An input points at a transaction that is not in the chain (hex id)
    ReferencedTransactionNotFound(String),
    /// A lookup by id found nothing (hex id)
    TransactionNotFound(String),
    /// The nonce space was exhausted without meeting the target
    ProofOfWorkExhausted { max_nonce: u64 },
    /// A cooperative stop was requested during the nonce search
    MiningCancelled,
    InvalidBlock(String),
    Crypto(String),
    Serialization(String),
    InvalidAddress(String),
    Wallet(String),
    Config(String),
    Io(String),
}

impl LedgerError {
    /// Validation failures the caller can report and move on from.
    /// Everything else aborts the current operation.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LedgerError::InsufficientFunds { .. } | LedgerError::InvalidTransaction(_)
        )
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::StoreUnavailable(msg) => write!(f, "Store unavailable: {msg}"),
            LedgerError::LedgerAlreadyExists(location) => {
                write!(f, "A ledger already exists at {location}")
            }
            LedgerError::LedgerNotFound(location) => write!(
                f,
                "No existing ledger found at {location}, create one first"
            ),
            LedgerError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {required}, available {available}"
                )
            }
            LedgerError::InvalidTransaction(msg) => write!(f, "Invalid transaction: {msg}"),
            LedgerError::ReferencedTransactionNotFound(id) => {
                write!(f, "Referenced transaction not found: {id}")
            }
            LedgerError::TransactionNotFound(id) => write!(f, "Transaction not found: {id}"),
            LedgerError::ProofOfWorkExhausted { max_nonce } => write!(
                f,
                "Proof-of-work exhausted the nonce space (limit {max_nonce})"
            ),
            LedgerError::MiningCancelled => write!(f, "Mining was cancelled"),
            LedgerError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            LedgerError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            LedgerError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            LedgerError::InvalidAddress(addr) => write!(f, "Invalid address: {addr}"),
            LedgerError::Wallet(msg) => write!(f, "Wallet error: {msg}"),
            LedgerError::Config(msg) => write!(f, "Configuration error: {msg}"),
            LedgerError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Io(err.to_string())
    }
}

impl From<sled::Error> for LedgerError {
    fn from(err: sled::Error) -> Self {
        LedgerError::StoreUnavailable(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for LedgerError {
    fn from(err: bincode::error::EncodeError) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for LedgerError {
    fn from(err: bincode::error::DecodeError) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}
