use thiserror::Error;

use super::responses::RemoteErrorKind;

#[derive(Error, Debug)]
pub enum MiniRpcError {
    #[error("Short read: expected {expected} bytes, received {received}")]
    ShortRead { expected: usize, received: usize },

    #[error("Message too large: {size} bytes (max {max} bytes)")]
    MessageTooLarge { size: u128, max: usize },

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("{kind}: {message}")]
    Remote {
        kind: RemoteErrorKind,
        message: String,
    },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MiniRpcError {
    /// Whether the error was raised by the remote callable (as opposed to the
    /// transport or the protocol layer).
    pub fn is_remote(&self) -> bool {
        matches!(self, MiniRpcError::Remote { .. })
    }

    /// Whether the error came from the byte stream: connecting, reading or
    /// writing a frame.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            MiniRpcError::ShortRead { .. }
                | MiniRpcError::MessageTooLarge { .. }
                | MiniRpcError::Connection(_)
                | MiniRpcError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MiniRpcError>;
