mod events;
mod notification;


use std::{sync::Arc, time::Duration};

use anyhow::Error;
use async_trait::async_trait;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{
    sync::Semaphore,
    time::{sleep, timeout}
};

use crate::{
    config::{SYNC_POLL_INTERVAL, SYNC_TIMEOUT},
    error::WalletConnectError,
    params::{fingerprint_param, prepare, PreparedCommand},
    preferences::PreferencesStore,
    registry::{registry, CommandRegistry, DispatchMode},
    store::{Pair, PairingStore}
};

pub use events::*;
pub use notification::*;

// Wallet sync state as reported by the wallet service
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SyncStatus {
    pub synced: bool,
    pub syncing: bool,
}

// What the confirmation dialog should say
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationPrompt {
    // Execute with the currently active key
    Execute,
    // Execute after switching to the given key
    ExecuteWithKeySwitch { fingerprint: u32 },
}

// A coerced parameter value shown to the user for review
#[derive(Debug, Clone)]
pub struct ConfirmationValue {
    pub name: &'static str,
    pub value: Value,
}

// Everything the user-facing collaborator needs to render a
// confirmation dialog for one request
#[derive(Debug, Clone)]
pub struct ConfirmationRequest {
    pub topic: String,
    pub command: String,
    pub prompt: ConfirmationPrompt,
    pub values: Vec<ConfirmationValue>,
    pub fingerprint: Option<u32>,
    // whether a "remember my choice" option may be offered
    pub bypassable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Confirm,
    Reject,
    // remember the choice for this command on this pair
    ConfirmAlways,
    RejectAlways,
}

impl ConfirmationOutcome {
    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Confirm | Self::ConfirmAlways)
    }

    pub fn is_remembered(&self) -> bool {
        matches!(self, Self::ConfirmAlways | Self::RejectAlways)
    }
}

// Contract with the wallet side of the bridge: confirmation dialogs,
// key management, sync state, command execution and notification display
#[async_trait]
pub trait WalletHandler: Send + Sync {
    // Ask the user to confirm a request; a closed or canceled dialog
    // must resolve (to Reject), never hang
    async fn request_confirmation(&self, request: ConfirmationRequest) -> Result<ConfirmationOutcome, Error>;

    // Invoke the wallet-API operation with the coerced params
    async fn execute(&self, operation: &str, params: Map<String, Value>) -> Result<Value, Error>;

    // Currently active wallet key
    async fn get_current_fingerprint(&self) -> Result<u32, Error>;

    // Switch the active wallet key
    async fn log_in(&self, fingerprint: u32) -> Result<(), Error>;

    async fn get_sync_status(&self) -> Result<SyncStatus, Error>;

    // Hand a dApp notification to the UI
    async fn show_notification(&self, notification: Notification) -> Result<(), Error>;
}

// Per-request pipeline:
// prepare -> authorize fingerprint -> bypass/confirm -> key switch
// -> sync wait -> re-validate -> dispatch.
// Every path terminates in a reply; the caller converts errors to the
// uniform wire error shape.
pub struct WalletConnectBridge<W: WalletHandler> {
    handler: W,
    store: Arc<PairingStore>,
    preferences: PreferencesStore,
    registry: &'static CommandRegistry,
    // limits confirmation requests to one at a time
    semaphore: Semaphore,
    sync_timeout: Duration,
    sync_poll_interval: Duration,
}

impl<W: WalletHandler> WalletConnectBridge<W> {
    pub fn new(handler: W, store: Arc<PairingStore>, preferences: PreferencesStore) -> Self {
        Self {
            handler,
            store,
            preferences,
            registry: registry(),
            semaphore: Semaphore::new(1),
            sync_timeout: SYNC_TIMEOUT,
            sync_poll_interval: SYNC_POLL_INTERVAL,
        }
    }

    pub fn with_sync_bounds(mut self, sync_timeout: Duration, poll_interval: Duration) -> Self {
        self.sync_timeout = sync_timeout;
        self.sync_poll_interval = poll_interval;
        self
    }

    pub fn handler(&self) -> &W {
        &self.handler
    }

    pub fn store(&self) -> &PairingStore {
        &self.store
    }

    pub fn preferences(&self) -> &PreferencesStore {
        &self.preferences
    }

    fn ensure_enabled(&self) -> Result<(), WalletConnectError> {
        if !self.preferences.load()?.enabled {
            return Err(WalletConnectError::Disabled)
        }

        Ok(())
    }

    // Register a new pair for a consumed pairing URI, before any session exists
    pub async fn register_pair(&self, topic: String, mainnet: bool, fingerprints: Vec<u32>) -> Result<Pair, WalletConnectError> {
        self.ensure_enabled()?;

        let pair = Pair::new(topic, mainnet, fingerprints);
        self.store.add_pair(pair.clone()).await?;
        Ok(pair)
    }

    // Handle one inbound session request against the session identified
    // by `topic`, returning the wallet-API result verbatim
    pub async fn process_request(&self, topic: &str, method: &str, raw_params: &Value) -> Result<Value, WalletConnectError> {
        let raw = match raw_params {
            Value::Object(raw) => raw.clone(),
            Value::Null => Map::new(),
            other => return Err(WalletConnectError::InvalidArgument("params", other.clone())),
        };
        let prepared = prepare(self.registry, method, &raw)?;
        let definition = prepared.definition;
        trace!("processing '{}' on session '{}'", definition.command, topic);

        // Notification commands are a local handoff, not a wallet call
        if matches!(definition.mode, DispatchMode::Notification) {
            return self.dispatch_notification(topic, &prepared).await;
        }

        // Fingerprint authorization: the preferences record is re-read
        // here rather than cached across requests
        let requested_fingerprint = fingerprint_param(raw.get("fingerprint"))?;

        let mut switch_fingerprint = None;
        if !definition.requires_all_fingerprints {
            if let Some(fingerprint) = requested_fingerprint {
                let current = self.handler.get_current_fingerprint().await?;
                if fingerprint != current {
                    if !self.preferences.load()?.allow_confirmation_fingerprint_change {
                        return Err(WalletConnectError::UnauthorizedFingerprint(fingerprint))
                    }

                    switch_fingerprint = Some(fingerprint);
                }
            }
        }

        let confirmed = self.confirm(topic, &prepared, requested_fingerprint, switch_fingerprint).await?;
        if !confirmed {
            return Err(WalletConnectError::UserRejected(definition.command.to_string()))
        }

        if let Some(fingerprint) = switch_fingerprint {
            debug!("switching active key to {} for '{}'", fingerprint, definition.command);
            self.handler.log_in(fingerprint).await?;
        }

        if definition.requires_wallet_sync {
            self.wait_for_sync().await?;
        }

        // Re-validate after the waits: the active key may have changed
        // underneath the in-flight request
        if !definition.requires_all_fingerprints {
            if let Some(fingerprint) = requested_fingerprint {
                let current = self.handler.get_current_fingerprint().await?;
                if current != fingerprint {
                    return Err(WalletConnectError::FingerprintChanged)
                }
            }
        }

        match &definition.mode {
            DispatchMode::WalletApi { target } => {
                debug!("dispatching '{}' as wallet operation '{}'", definition.command, target);
                Ok(self.handler.execute(target, prepared.params).await?)
            },
            DispatchMode::Executor(executor) => {
                debug!("running custom executor for '{}'", definition.command);
                executor(&self.handler, prepared.params).await
            },
            // handled before the confirmation pipeline
            DispatchMode::Notification => Err(WalletConnectError::Internal("notification command reached dispatch")),
        }
    }

    async fn dispatch_notification(&self, topic: &str, prepared: &PreparedCommand<'_>) -> Result<Value, WalletConnectError> {
        let pair = self.store.get_pair_by_session(topic).await
            .ok_or_else(|| WalletConnectError::PairNotFound(topic.to_string()))?;

        let notification = Notification::from_request(&prepared.params, &pair)?;
        debug!("handing off '{}' notification {} from '{}'", prepared.definition.command, notification.id, notification.from);
        self.handler.show_notification(notification).await?;

        Ok(json!({ "success": true }))
    }

    // Resolve the confirmation outcome for a request: a remembered bypass
    // decision when one applies, otherwise an interactive dialog.
    // Confirmations are serialized one at a time.
    async fn confirm(
        &self,
        topic: &str,
        prepared: &PreparedCommand<'_>,
        fingerprint: Option<u32>,
        switch_fingerprint: Option<u32>,
    ) -> Result<bool, WalletConnectError> {
        let definition = prepared.definition;
        let _permit = self.semaphore.acquire().await
            .map_err(|_| WalletConnectError::Internal("confirmation semaphore closed"))?;

        // Re-fetch rather than cache: the pair may have been disconnected
        // while this request waited for its turn
        let pair = self.store.get_pair_by_session(topic).await
            .ok_or_else(|| WalletConnectError::PairNotFound(topic.to_string()))?;

        // A remembered outcome only applies while the registered definition
        // still marks the command bypassable; stale entries are ignored
        if definition.bypassable_confirmation {
            if let Some(remembered) = pair.bypass_for(definition.command) {
                debug!("bypassing confirmation for '{}' on pair '{}': remembered {}", definition.command, pair.topic, remembered);
                return Ok(remembered)
            }
        }

        let values = definition.params.iter()
            .filter(|spec| !spec.hidden)
            .filter_map(|spec| {
                prepared.params.get(spec.name).map(|value| ConfirmationValue {
                    name: spec.name,
                    value: value.clone(),
                })
            })
            .collect();

        let request = ConfirmationRequest {
            topic: topic.to_string(),
            command: definition.command.to_string(),
            prompt: match switch_fingerprint {
                Some(fingerprint) => ConfirmationPrompt::ExecuteWithKeySwitch { fingerprint },
                None => ConfirmationPrompt::Execute,
            },
            values,
            fingerprint,
            bypassable: definition.bypassable_confirmation,
        };

        let outcome = match self.handler.request_confirmation(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // a failed or dismissed dialog counts as a rejection
                debug!("error while requesting confirmation: {:#}", e);
                ConfirmationOutcome::Reject
            }
        };

        if outcome.is_remembered() && definition.bypassable_confirmation {
            self.store.bypass_command(topic, definition.command, outcome.is_positive()).await?;
        }

        Ok(outcome.is_positive())
    }

    // Block until the wallet reports itself synced, with a hard ceiling
    async fn wait_for_sync(&self) -> Result<(), WalletConnectError> {
        let poll = async {
            loop {
                match self.handler.get_sync_status().await {
                    Ok(status) if status.synced => return,
                    Ok(_) => trace!("wallet not synced yet"),
                    Err(e) => debug!("error while fetching sync status: {:#}", e),
                }

                sleep(self.sync_poll_interval).await;
            }
        };

        timeout(self.sync_timeout, poll).await
            .map_err(|_| WalletConnectError::SyncTimeout(self.sync_timeout))
    }
}
