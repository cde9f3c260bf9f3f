use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{error::WalletConnectError, store::Pair};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Offer,
    Announcement,
}

// Local notification handed off to the UI when a dApp sends
// showNotification; never serialized onto the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    // unique per notification so display/acknowledgement stays idempotent
    pub id: String,
    pub from: String,
    // unix seconds
    pub timestamp: u64,
    pub fingerprints: Vec<u32>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Notification {
    // Build a notification from coerced showNotification params and the
    // metadata of the pair that sent it
    pub fn from_request(params: &Map<String, Value>, pair: &Pair) -> Result<Self, WalletConnectError> {
        let kind = match params.get("type").and_then(Value::as_str) {
            Some("offer") => NotificationKind::Offer,
            Some("announcement") => NotificationKind::Announcement,
            Some(other) => return Err(WalletConnectError::InvalidArgument("type", Value::String(other.to_string()))),
            None => return Err(WalletConnectError::MissingArgument("type")),
        };

        let offer_data = params.get("offerData").and_then(Value::as_str).map(str::to_string);
        let message = params.get("message").and_then(Value::as_str).map(str::to_string);
        let url = params.get("url").and_then(Value::as_str).map(str::to_string);

        match kind {
            NotificationKind::Offer if offer_data.is_none() => {
                return Err(WalletConnectError::MissingArgument("offerData"))
            },
            NotificationKind::Announcement if message.is_none() => {
                return Err(WalletConnectError::MissingArgument("message"))
            },
            _ => {}
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| WalletConnectError::Internal("system clock before unix epoch"))?
            .as_secs();

        let from = pair.metadata.as_ref()
            .map(|metadata| metadata.name.clone())
            .unwrap_or_else(|| pair.topic.clone());

        Ok(Self {
            id: format!("{}-{:08x}", timestamp, rand::random::<u32>()),
            from,
            timestamp,
            fingerprints: pair.fingerprints.clone(),
            kind,
            offer_data,
            message,
            url,
        })
    }
}
