//! Envelope codec.
//!
//! Two wire shapes leave the gateway:
//!
//! ```text
//! success: {"code":"000000","msg":"请求成功","data":"<original body>"}
//! failure: {"code":404,"message":"Service Not Found"}
//! ```
//!
//! Field order is fixed by the struct definitions below; serde_json keeps
//! non-ASCII text unescaped.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayResult;

/// Default success code.
pub const SUCCESS_CODE: &str = "000000";

/// Default success message.
pub const SUCCESS_MSG: &str = "请求成功";

/// Normalized wrapper applied to every successful response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub code: String,
    pub msg: String,
    pub data: Value,
}

impl Envelope {
    /// Wrap an opaque body text. The text is stored as a JSON string and is
    /// never re-parsed.
    pub fn wrap_text(code: impl Into<String>, msg: impl Into<String>, text: String) -> Self {
        Self {
            code: code.into(),
            msg: msg.into(),
            data: Value::String(text),
        }
    }
}

/// Error shape written by the error envelope mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

/// Serialize any envelope shape to its wire bytes.
pub fn encode<T: Serialize>(value: &T) -> GatewayResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Parse wire bytes back into an envelope shape.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> GatewayResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}
