//! Error types for the application.

use thiserror::Error;

use crate::common::types::QualifiedChatId;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Association store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access store file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Store snapshot is corrupt: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Master transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),

    #[error("Invalid link '{url}': {source}")]
    InvalidLink {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Errors reported by a slave backend when sending.
#[derive(Debug, Error)]
pub enum SlaveError {
    #[error("Chat '{chat_uid}' not found in channel")]
    ChatNotFound { chat_uid: String },

    #[error("Slave backend unavailable: {message}")]
    Unavailable { message: String },
}

/// Errors raised while linking chats or routing messages.
///
/// The `Display` text of the first group of variants is exactly what the
/// user sees in the master chat.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Unknown recipient.")]
    UnknownRecipient,

    #[error("Internal error: Channel not found.")]
    ChannelNotFound { channel: String },

    #[error("Internal error: Chat not found in channel.")]
    ChatNotFoundInChannel { chat: QualifiedChatId },

    #[error("Session expired. Please try again.")]
    SessionExpired,

    #[error("Command '{verb}' ({payload}) is not recognised, please try again.")]
    UnrecognizedAction { verb: String, payload: String },

    #[error("No chat is found linked with this group. Please send /link privately to link a chat.")]
    NoLinkedChat,

    #[error("Internal error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Transport(#[from] TransportError),

    #[error("Internal error: {0}")]
    Slave(SlaveError),
}

impl RelayError {
    /// Whether this error is an expected outcome of user input rather than
    /// a failure of a collaborator.
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            RelayError::Store(_) | RelayError::Transport(_) | RelayError::Slave(_)
        )
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for master transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Result type alias for slave backend operations.
pub type SlaveResult<T> = std::result::Result<T, SlaveError>;

/// Result type alias for linking and routing.
pub type RelayResult<T> = std::result::Result<T, RelayError>;
