use std::time::Duration;

// Prefix applied to every bridge command on the wire
pub const COMMAND_PREFIX: &str = "chia_";

// CAIP-2 chain identifiers negotiated with dApps
pub const CHAIN_NAMESPACE: &str = "chia";
pub const MAINNET_CHAIN_ID: &str = "chia:mainnet";
pub const TESTNET_CHAIN_ID: &str = "chia:testnet";

// keys used in the local preference store
pub const PAIRS_STORAGE_KEY: &str = "walletConnectPairs";
pub const PREFERENCES_STORAGE_KEY: &str = "walletConnectPreferences";

// Commands marked as sync-dependent wait for the wallet to catch up
// before dispatch, polled at a short interval with a hard ceiling
pub const SYNC_TIMEOUT: Duration = Duration::from_secs(60 * 60);
pub const SYNC_POLL_INTERVAL: Duration = Duration::from_secs(1);
