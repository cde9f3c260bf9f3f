use std::{collections::HashMap, sync::Mutex};

use log::trace;
use serde_json::Value;

use crate::error::WalletConnectError;

// Local key-value preference store backing pairing and preference state.
// Implementations must persist whole records synchronously: callers rely
// on no suspension point between reading and writing the same key.
pub trait StorageBackend: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Value>, WalletConnectError>;
    fn save(&self, key: &str, value: &Value) -> Result<(), WalletConnectError>;
}

// On-disk backend
pub struct SledBackend {
    db: sled::Db,
}

impl SledBackend {
    pub fn open(path: &str) -> Result<Self, WalletConnectError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    pub fn new(db: sled::Db) -> Self {
        Self { db }
    }
}

impl StorageBackend for SledBackend {
    fn load(&self, key: &str) -> Result<Option<Value>, WalletConnectError> {
        match self.db.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save(&self, key: &str, value: &Value) -> Result<(), WalletConnectError> {
        trace!("saving '{}' to disk", key);
        self.db.insert(key, serde_json::to_vec(value)?)?;
        self.db.flush()?;
        Ok(())
    }
}

// In-memory backend, used in tests and on platforms without disk access
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Option<Value>, WalletConnectError> {
        let entries = self.entries.lock()
            .map_err(|_| WalletConnectError::Internal("storage mutex poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, value: &Value) -> Result<(), WalletConnectError> {
        let mut entries = self.entries.lock()
            .map_err(|_| WalletConnectError::Internal("storage mutex poisoned"))?;
        entries.insert(key.into(), value.clone());
        Ok(())
    }
}
