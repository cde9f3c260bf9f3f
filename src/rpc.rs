use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::WalletConnectError;

pub const JSON_RPC_VERSION: &str = "2.0";

// Inbound session_request event as delivered by the transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    pub id: u64,
    pub topic: String,
    pub params: SessionRequestParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequestParams {
    pub request: RequestPayload,
    #[serde(rename = "chainId")]
    pub chain_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestPayload {
    // Always the prefixed command name, e.g. "chia_getWalletBalance"
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

// Outbound reply sent back over the session transport.
// The response field is a complete JSON-RPC 2.0 response object.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReply {
    pub topic: String,
    pub response: Value,
}

impl SessionReply {
    pub fn success(topic: &str, id: u64, result: Value) -> Self {
        Self {
            topic: topic.into(),
            response: json!({
                "id": id,
                "jsonrpc": JSON_RPC_VERSION,
                "result": result
            }),
        }
    }

    pub fn error(topic: &str, id: u64, error: &WalletConnectError) -> Self {
        Self {
            topic: topic.into(),
            response: json!({
                "id": id,
                "jsonrpc": JSON_RPC_VERSION,
                "error": {
                    "code": error.get_code(),
                    "message": format!("{:#}", error)
                }
            }),
        }
    }
}
