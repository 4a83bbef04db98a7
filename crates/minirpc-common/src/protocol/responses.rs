//! minirpc Response Types
//!
//! This module defines the response envelope and the error kinds carried by it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// RPC method result (JSON value)
pub type RpcResult = serde_json::Value;

/// The response envelope returned by the server for every request.
///
/// Exactly one variant is sent per connection, discriminated by the `type` field:
///
/// ```text
/// {"type": "result", "content": 5}
/// {"type": "error", "exc_type": "KeyError", "message": "no such method: 'mul'"}
/// ```
///
/// # Example
///
/// ```
/// use minirpc_common::protocol::responses::Response;
/// use serde_json::json;
///
/// let ok = Response::result(json!(5));
/// let err = Response::error("KeyError", "no such method: 'mul'");
/// assert!(ok.is_result());
/// assert!(!err.is_result());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Response {
    /// The callable returned normally
    Result {
        /// Return value of the callable, `null` when absent
        #[serde(default)]
        content: RpcResult,
    },
    /// The request failed: lookup miss, malformed request or callable failure
    Error {
        /// Name of the failure kind, e.g. `KeyError`
        exc_type: String,
        /// Human readable failure message
        message: String,
    },
}

impl Response {
    /// Creates a successful response.
    pub fn result(content: RpcResult) -> Self {
        Response::Result { content }
    }

    /// Creates an error response.
    ///
    /// # Arguments
    ///
    /// * `exc_type` - The failure kind name (see [`RemoteErrorKind`])
    /// * `message` - The failure message
    pub fn error(exc_type: impl Into<String>, message: impl Into<String>) -> Self {
        Response::Error {
            exc_type: exc_type.into(),
            message: message.into(),
        }
    }

    pub fn is_result(&self) -> bool {
        matches!(self, Response::Result { .. })
    }
}

/// Failure kinds understood by both ends of the wire.
///
/// The names match the `exc_type` strings exchanged with other implementations
/// of the protocol. Kinds this side does not know are kept verbatim in
/// [`RemoteErrorKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RemoteErrorKind {
    /// The requested method is not registered
    Key,
    /// The request envelope could not be decoded
    Value,
    /// An argument was missing or had the wrong type
    Type,
    /// The request frame could not be read
    Os,
    /// The callable panicked or failed without a more specific kind
    Runtime,
    /// Any other kind name, carried as-is
    Other(String),
}

impl RemoteErrorKind {
    pub const KEY_ERROR: &'static str = "KeyError";
    pub const VALUE_ERROR: &'static str = "ValueError";
    pub const TYPE_ERROR: &'static str = "TypeError";
    pub const OS_ERROR: &'static str = "OSError";
    pub const RUNTIME_ERROR: &'static str = "RuntimeError";

    pub fn from_name(name: &str) -> Self {
        match name {
            Self::KEY_ERROR => RemoteErrorKind::Key,
            Self::VALUE_ERROR => RemoteErrorKind::Value,
            Self::TYPE_ERROR => RemoteErrorKind::Type,
            Self::OS_ERROR => RemoteErrorKind::Os,
            Self::RUNTIME_ERROR => RemoteErrorKind::Runtime,
            other => RemoteErrorKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RemoteErrorKind::Key => Self::KEY_ERROR,
            RemoteErrorKind::Value => Self::VALUE_ERROR,
            RemoteErrorKind::Type => Self::TYPE_ERROR,
            RemoteErrorKind::Os => Self::OS_ERROR,
            RemoteErrorKind::Runtime => Self::RUNTIME_ERROR,
            RemoteErrorKind::Other(name) => name,
        }
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
