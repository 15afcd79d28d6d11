//! Response envelope shared by all API endpoints
//!
//! Every endpoint except `/nonce` wraps its body in `{ok, message?, data?}`;
//! `/nonce` returns the bare token object clients sign.

use serde::{Deserialize, Serialize};

/// The `{ok, message?, data?}` envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Whether the request succeeded at the application level
    pub ok: bool,

    /// User-facing message, set on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Payload, set on success when the endpoint returns data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ApiResponse {
    /// Failure envelope with a user-facing message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: Some(message.into()),
            data: None,
        }
    }

    /// Success envelope wrapping a serializable payload
    pub fn data<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self {
                ok: true,
                message: None,
                data: Some(value),
            },
            Err(_) => Self::error("Failed to process data"),
        }
    }

    /// Success envelope with no payload
    pub fn empty() -> Self {
        Self {
            ok: true,
            message: None,
            data: None,
        }
    }
}
