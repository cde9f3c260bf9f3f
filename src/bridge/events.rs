use anyhow::Error;
use async_trait::async_trait;
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    config::{CHAIN_NAMESPACE, MAINNET_CHAIN_ID, TESTNET_CHAIN_ID},
    error::WalletConnectError,
    params::fingerprint_param,
    rpc::{SessionReply, SessionRequest, SessionRequestParams},
    store::{PairMetadata, PairUpdate, Session, SessionNamespace}
};

use super::{WalletConnectBridge, WalletHandler};

// Namespace requirements carried by a session proposal
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProposalNamespace {
    #[serde(default)]
    pub chains: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub events: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProposalEvent {
    pub id: u64,
    pub pairing_topic: String,
    pub proposer: PairMetadata,
    pub required_namespaces: IndexMap<String, ProposalNamespace>,
}

// Inbound transport events, consumed by a single dispatcher so handlers
// stay idempotent and side-effect-scoped to the store
#[derive(Debug, Clone)]
pub enum WalletConnectEvent {
    SessionProposal(SessionProposalEvent),
    SessionDelete { topic: String },
    PairingDelete { topic: String },
    SessionRequest(SessionRequest),
}

#[derive(Debug, Clone)]
pub struct PairingInfo {
    pub topic: String,
    pub active: bool,
}

// Callback contract of the WalletConnect relay client.
// Pairing, session transport and event delivery live behind it.
#[async_trait]
pub trait Transport: Send + Sync {
    // Approve a session proposal; resolves to the new session topic
    // once the dApp acknowledges
    async fn approve_session(&self, proposal_id: u64, namespaces: IndexMap<String, SessionNamespace>) -> Result<String, Error>;

    async fn reject_session(&self, proposal_id: u64, reason: String) -> Result<(), Error>;

    // Reply to a session request over the session transport
    async fn respond(&self, reply: SessionReply) -> Result<(), Error>;

    // Live pairings known to the relay
    async fn pairings(&self) -> Result<Vec<PairingInfo>, Error>;

    async fn disconnect_pairing(&self, topic: &str) -> Result<(), Error>;

    async fn activate_pairing(&self, topic: &str) -> Result<(), Error>;
}

impl<W: WalletHandler> WalletConnectBridge<W> {
    pub async fn handle_event<T: Transport>(&self, transport: &T, event: WalletConnectEvent) -> Result<(), WalletConnectError> {
        match event {
            WalletConnectEvent::SessionProposal(event) => self.on_session_proposal(transport, event).await,
            WalletConnectEvent::SessionDelete { topic } => {
                debug!("session '{}' deleted by transport", topic);
                self.store().remove_session_from_pair(&topic).await
            },
            WalletConnectEvent::PairingDelete { topic } => {
                debug!("pairing '{}' deleted by transport", topic);
                self.store().remove_pair(&topic).await
            },
            WalletConnectEvent::SessionRequest(request) => self.on_session_request(transport, request).await,
        }
    }

    // Attach proposer metadata to the pair, compute the account list from
    // its fingerprints, approve, and record the new session once acknowledged
    async fn on_session_proposal<T: Transport>(&self, transport: &T, event: SessionProposalEvent) -> Result<(), WalletConnectError> {
        match self.accept_session_proposal(transport, &event).await {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!("rejecting session proposal {}: {:#}", event.id, e);
                if let Err(e) = transport.reject_session(event.id, format!("{:#}", e)).await {
                    warn!("error while rejecting session proposal {}: {:#}", event.id, e);
                }

                Err(e)
            }
        }
    }

    async fn accept_session_proposal<T: Transport>(&self, transport: &T, event: &SessionProposalEvent) -> Result<(), WalletConnectError> {
        self.ensure_enabled()?;

        let namespace = event.required_namespaces.get(CHAIN_NAMESPACE)
            .ok_or_else(|| WalletConnectError::UnrecognizedChain(String::new()))?;

        let chain = namespace.chains.first()
            .ok_or_else(|| WalletConnectError::UnrecognizedChain(String::new()))?;

        if !is_recognized_chain(chain) {
            return Err(WalletConnectError::UnrecognizedChain(chain.clone()))
        }

        let pair = self.store().get_pair(&event.pairing_topic).await
            .ok_or_else(|| WalletConnectError::PairNotFound(event.pairing_topic.clone()))?;

        if chain != pair.chain_id() {
            return Err(WalletConnectError::ChainMismatch(chain.clone(), pair.chain_id()))
        }

        self.store().update_pair(&event.pairing_topic, PairUpdate::metadata(event.proposer.clone())).await?;

        let accounts = pair.fingerprints.iter()
            .map(|fingerprint| format!("{}:{}", chain, fingerprint))
            .collect();

        let mut namespaces = IndexMap::new();
        namespaces.insert(CHAIN_NAMESPACE.to_string(), SessionNamespace {
            accounts,
            methods: self.registry.methods(),
            events: namespace.events.clone(),
        });

        let session_topic = transport.approve_session(event.id, namespaces.clone()).await?;
        info!("session '{}' established on pair '{}'", session_topic, pair.topic);

        self.store().update_pair_with(&event.pairing_topic, |pair| {
            pair.sessions.push(Session {
                topic: session_topic,
                namespaces,
            });
        }).await
    }

    // Process a session request end to end and reply on the transport.
    // The pipeline never leaves a request unanswered: every failure is
    // converted into the uniform wire error shape.
    pub async fn on_session_request<T: Transport>(&self, transport: &T, request: SessionRequest) -> Result<(), WalletConnectError> {
        let SessionRequest { id, topic, params } = request;

        let reply = match self.handle_session_request(&topic, &params).await {
            Ok(result) => SessionReply::success(&topic, id, result),
            Err(e) => {
                debug!("request {} on session '{}' failed: {:#}", id, topic, e);
                SessionReply::error(&topic, id, &e)
            }
        };

        // The pairing may already be torn down ("no matching key"); there
        // is nothing left to reply to, so the failure is only logged
        if let Err(e) = transport.respond(reply).await {
            warn!("error while replying to request {} on session '{}': {:#}", id, topic, e);
        }

        Ok(())
    }

    async fn handle_session_request(&self, topic: &str, params: &SessionRequestParams) -> Result<Value, WalletConnectError> {
        let pair = self.store().get_pair_by_session(topic).await
            .ok_or_else(|| WalletConnectError::PairNotFound(topic.to_string()))?;

        if !is_recognized_chain(&params.chain_id) {
            return Err(WalletConnectError::UnrecognizedChain(params.chain_id.clone()))
        }

        if params.chain_id != pair.chain_id() {
            return Err(WalletConnectError::ChainMismatch(params.chain_id.clone(), pair.chain_id()))
        }

        // the requested key must be one granted to this pairing
        if let Some(fingerprint) = fingerprint_param(params.request.params.get("fingerprint"))? {
            if !pair.fingerprints.contains(&fingerprint) {
                return Err(WalletConnectError::UnauthorizedFingerprint(fingerprint))
            }
        }

        self.process_request(topic, &params.request.method, &params.request.params).await
    }

    // Startup reconciliation between the persisted pair list and the
    // relay's live pairings
    pub async fn reconcile_pairings<T: Transport>(&self, transport: &T) -> Result<(), WalletConnectError> {
        let live = transport.pairings().await?;
        let local = self.store().pairs().await;

        // local records with no live pairing are stale
        for pair in &local {
            if !live.iter().any(|pairing| pairing.topic == pair.topic) {
                info!("removing stale pair '{}'", pair.topic);
                self.store().remove_pair(&pair.topic).await?;
            }
        }

        for pairing in &live {
            if !local.iter().any(|pair| pair.topic == pairing.topic) {
                // live pairing we have no record of: disconnect it
                info!("disconnecting unknown pairing '{}'", pairing.topic);
                if let Err(e) = transport.disconnect_pairing(&pairing.topic).await {
                    warn!("error while disconnecting pairing '{}': {:#}", pairing.topic, e);
                }
            } else if !pairing.active {
                debug!("reactivating pairing '{}'", pairing.topic);
                if let Err(e) = transport.activate_pairing(&pairing.topic).await {
                    warn!("error while activating pairing '{}': {:#}", pairing.topic, e);
                }
            }
        }

        Ok(())
    }
}

fn is_recognized_chain(chain_id: &str) -> bool {
    chain_id == MAINNET_CHAIN_ID || chain_id == TESTNET_CHAIN_ID
}
