use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::{MAINNET_CHAIN_ID, TESTNET_CHAIN_ID};

// dApp-supplied metadata; may arrive after the pair is created
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairMetadata {
    pub name: String,
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub icons: Vec<String>,
}

// Capabilities negotiated for one namespace of a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionNamespace {
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub events: Vec<String>,
}

// An active connection within a pair.
// Its topic is unique across all sessions and pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub topic: String,
    #[serde(default)]
    pub namespaces: IndexMap<String, SessionNamespace>,
}

// A persisted dApp-to-wallet-key association, identified by its pairing topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pair {
    pub topic: String,
    pub mainnet: bool,
    // wallet keys granted to this pairing
    pub fingerprints: Vec<u32>,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PairMetadata>,
    // per-command remembered confirmation outcome
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub bypass_commands: IndexMap<String, bool>,
}

impl Pair {
    pub fn new(topic: String, mainnet: bool, fingerprints: Vec<u32>) -> Self {
        Self {
            topic,
            mainnet,
            fingerprints,
            sessions: Vec::new(),
            metadata: None,
            bypass_commands: IndexMap::new(),
        }
    }

    pub fn chain_id(&self) -> &'static str {
        if self.mainnet {
            MAINNET_CHAIN_ID
        } else {
            TESTNET_CHAIN_ID
        }
    }

    pub fn has_session(&self, session_topic: &str) -> bool {
        self.sessions.iter().any(|session| session.topic == session_topic)
    }

    pub fn bypass_for(&self, command: &str) -> Option<bool> {
        self.bypass_commands.get(command).copied()
    }
}

// Partial patch merged into an existing pair by `update_pair`
#[derive(Debug, Clone, Default)]
pub struct PairUpdate {
    pub mainnet: Option<bool>,
    pub fingerprints: Option<Vec<u32>>,
    pub sessions: Option<Vec<Session>>,
    pub metadata: Option<PairMetadata>,
}

impl PairUpdate {
    pub fn metadata(metadata: PairMetadata) -> Self {
        Self {
            metadata: Some(metadata),
            ..Self::default()
        }
    }

    pub fn apply(self, pair: &mut Pair) {
        if let Some(mainnet) = self.mainnet {
            pair.mainnet = mainnet;
        }

        if let Some(fingerprints) = self.fingerprints {
            pair.fingerprints = fingerprints;
        }

        if let Some(sessions) = self.sessions {
            pair.sessions = sessions;
        }

        if let Some(metadata) = self.metadata {
            pair.metadata = Some(metadata);
        }
    }
}
