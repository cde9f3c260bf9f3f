use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

// Every application-level failure is reported to the dApp with this
// single JSON-RPC error code ("Invalid Request"); the bridge does not
// distinguish finer-grained codes on the wire.
pub const INVALID_REQUEST_CODE: i32 = -32600;

#[derive(Error, Debug)]
pub enum WalletConnectError {
    #[error("Unknown command '{}'", _0)]
    UnknownCommand(String),
    #[error("Missing required argument '{}'", _0)]
    MissingArgument(&'static str),
    #[error("Invalid value for argument '{}': {}", _0, _1)]
    InvalidArgument(&'static str, Value),
    #[error("Pair with topic '{}' already exists", _0)]
    DuplicatePair(String),
    #[error("No pair found for topic '{}'", _0)]
    PairNotFound(String),
    #[error("Fingerprint {} is not the active key and fingerprint switching is disabled", _0)]
    UnauthorizedFingerprint(u32),
    #[error("User rejected command '{}'", _0)]
    UserRejected(String),
    #[error("Active fingerprint changed while the request was in flight")]
    FingerprintChanged,
    #[error("Wallet did not reach synced state within {:?}", _0)]
    SyncTimeout(Duration),
    #[error("WalletConnect is disabled in preferences")]
    Disabled,
    #[error("Unrecognized chain id '{}'", _0)]
    UnrecognizedChain(String),
    #[error("Chain id '{}' does not match the pair's network '{}'", _0, _1)]
    ChainMismatch(String, &'static str),
    #[error("Internal error: {}", _0)]
    Internal(&'static str),
    #[error("Unexpected error on database: {}", _0)]
    Storage(#[from] sled::Error),
    #[error("Invalid persisted state: {}", _0)]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

impl WalletConnectError {
    pub fn get_code(&self) -> i32 {
        INVALID_REQUEST_CODE
    }
}
