use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    config::PREFERENCES_STORAGE_KEY,
    error::WalletConnectError,
    store::StorageBackend
};

// Process-wide bridge policy, persisted as a single record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    // master switch: when false, no new pairing and no new confirmation
    // client may be initialized (open sessions are a caller concern)
    pub enabled: bool,
    // whether the orchestrator may switch keys to serve a request
    // targeting a non-active fingerprint
    pub allow_confirmation_fingerprint_change: bool,
    // reserved; declared for parity with the persisted record but not wired
    pub auto_confirm: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_confirmation_fingerprint_change: false,
            auto_confirm: false,
        }
    }
}

pub struct PreferencesStore {
    backend: Arc<dyn StorageBackend>,
}

impl PreferencesStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn load(&self) -> Result<Preferences, WalletConnectError> {
        match self.backend.load(PREFERENCES_STORAGE_KEY)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Preferences::default()),
        }
    }

    pub fn save(&self, preferences: &Preferences) -> Result<(), WalletConnectError> {
        self.backend.save(PREFERENCES_STORAGE_KEY, &serde_json::to_value(preferences)?)
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<(), WalletConnectError> {
        debug!("setting WalletConnect enabled = {}", enabled);
        let mut preferences = self.load()?;
        preferences.enabled = enabled;
        self.save(&preferences)
    }

    pub fn set_allow_confirmation_fingerprint_change(&self, allow: bool) -> Result<(), WalletConnectError> {
        let mut preferences = self.load()?;
        preferences.allow_confirmation_fingerprint_change = allow;
        self.save(&preferences)
    }
}
