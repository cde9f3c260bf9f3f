mod backend;
mod types;


use std::sync::Arc;

use log::debug;
use tokio::sync::Mutex;

use crate::{config::PAIRS_STORAGE_KEY, error::WalletConnectError};

pub use backend::{MemoryBackend, SledBackend, StorageBackend};
pub use types::*;

// Persisted collection of pairs, kept as an ordered list.
// Every mutation is a read-modify-write of the whole list under one lock,
// flushed synchronously so interleaved requests always observe the
// latest state (read-after-write per pair).
pub struct PairingStore {
    backend: Arc<dyn StorageBackend>,
    pairs: Mutex<Vec<Pair>>,
}

impl PairingStore {
    // Load the persisted pair list, starting empty when none exists yet
    pub fn load(backend: Arc<dyn StorageBackend>) -> Result<Self, WalletConnectError> {
        let pairs = match backend.load(PAIRS_STORAGE_KEY)? {
            Some(value) => serde_json::from_value(value)?,
            None => Vec::new(),
        };

        Ok(Self {
            backend,
            pairs: Mutex::new(pairs),
        })
    }

    fn persist(&self, pairs: &[Pair]) -> Result<(), WalletConnectError> {
        self.backend.save(PAIRS_STORAGE_KEY, &serde_json::to_value(pairs)?)
    }

    pub async fn add_pair(&self, pair: Pair) -> Result<(), WalletConnectError> {
        let mut pairs = self.pairs.lock().await;
        if pairs.iter().any(|p| p.topic == pair.topic) {
            return Err(WalletConnectError::DuplicatePair(pair.topic));
        }

        debug!("adding pair '{}'", pair.topic);
        pairs.push(pair);
        self.persist(&pairs)
    }

    pub async fn get_pair(&self, topic: &str) -> Option<Pair> {
        let pairs = self.pairs.lock().await;
        pairs.iter().find(|p| p.topic == topic).cloned()
    }

    pub async fn has_pair(&self, topic: &str) -> bool {
        let pairs = self.pairs.lock().await;
        pairs.iter().any(|p| p.topic == topic)
    }

    // Snapshot of all pairs, for reconciliation and display
    pub async fn pairs(&self) -> Vec<Pair> {
        let pairs = self.pairs.lock().await;
        pairs.clone()
    }

    // Merge a partial patch into the pair; no-op when the topic is unknown
    pub async fn update_pair(&self, topic: &str, update: PairUpdate) -> Result<(), WalletConnectError> {
        self.update_pair_with(topic, |pair| update.apply(pair)).await
    }

    // Replace via a transform function receiving the current pair;
    // no-op when the topic is unknown
    pub async fn update_pair_with<F>(&self, topic: &str, f: F) -> Result<(), WalletConnectError>
    where
        F: FnOnce(&mut Pair)
    {
        let mut pairs = self.pairs.lock().await;
        match pairs.iter_mut().find(|p| p.topic == topic) {
            Some(pair) => f(pair),
            None => return Ok(()),
        };

        self.persist(&pairs)
    }

    // Removes the pair and all its sessions; idempotent
    pub async fn remove_pair(&self, topic: &str) -> Result<(), WalletConnectError> {
        let mut pairs = self.pairs.lock().await;
        let before = pairs.len();
        pairs.retain(|p| p.topic != topic);
        if pairs.len() == before {
            return Ok(());
        }

        debug!("removed pair '{}'", topic);
        self.persist(&pairs)
    }

    pub async fn get_pair_by_session(&self, session_topic: &str) -> Option<Pair> {
        let pairs = self.pairs.lock().await;
        pairs.iter().find(|p| p.has_session(session_topic)).cloned()
    }

    pub async fn remove_pair_by_session(&self, session_topic: &str) -> Result<(), WalletConnectError> {
        let mut pairs = self.pairs.lock().await;
        let before = pairs.len();
        pairs.retain(|p| !p.has_session(session_topic));
        if pairs.len() == before {
            return Ok(());
        }

        self.persist(&pairs)
    }

    // Removes just the matching session, leaving its pair intact
    pub async fn remove_session_from_pair(&self, session_topic: &str) -> Result<(), WalletConnectError> {
        let mut pairs = self.pairs.lock().await;
        let mut changed = false;
        for pair in pairs.iter_mut() {
            let before = pair.sessions.len();
            pair.sessions.retain(|session| session.topic != session_topic);
            changed |= pair.sessions.len() != before;
        }

        if !changed {
            return Ok(());
        }

        self.persist(&pairs)
    }

    // Remember a confirmation outcome for a command on the pair owning
    // the given session
    pub async fn bypass_command(&self, session_topic: &str, command: &str, confirmed: bool) -> Result<(), WalletConnectError> {
        let mut pairs = self.pairs.lock().await;
        let pair = pairs.iter_mut()
            .find(|p| p.has_session(session_topic))
            .ok_or_else(|| WalletConnectError::PairNotFound(session_topic.to_string()))?;

        debug!("remembering '{}' = {} for pair '{}'", command, confirmed, pair.topic);
        pair.bypass_commands.insert(command.to_string(), confirmed);
        self.persist(&pairs)
    }

    // Clears a single remembered outcome if present
    pub async fn remove_bypass_command(&self, session_topic: &str, command: &str) -> Result<(), WalletConnectError> {
        let mut pairs = self.pairs.lock().await;
        let removed = pairs.iter_mut()
            .find(|p| p.has_session(session_topic))
            .and_then(|pair| pair.bypass_commands.shift_remove(command));

        if removed.is_none() {
            return Ok(());
        }

        self.persist(&pairs)
    }

    pub async fn reset_bypass_for_pair(&self, topic: &str) -> Result<(), WalletConnectError> {
        let mut pairs = self.pairs.lock().await;
        match pairs.iter_mut().find(|p| p.topic == topic) {
            Some(pair) => pair.bypass_commands.clear(),
            None => return Ok(()),
        };

        self.persist(&pairs)
    }

    pub async fn reset_bypass_for_all_pairs(&self) -> Result<(), WalletConnectError> {
        let mut pairs = self.pairs.lock().await;
        for pair in pairs.iter_mut() {
            pair.bypass_commands.clear();
        }

        self.persist(&pairs)
    }
}
