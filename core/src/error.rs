//! Error types for the Emarsys client.
//!
//! # Design
//! Failures split into two closed families. `ClientError` covers everything
//! attributable to the caller: unknown field or choice names, a reply that
//! does not follow the envelope schema, JSON nested beyond the configured
//! depth, or a transport that reports a protocol violation. `ServerError`
//! covers the service and the network: connectivity failures, bodies that
//! are not JSON, and JSON that is not an object or array.
//!
//! A non-zero `replyCode` is not an error at this level; the envelope is
//! handed back to the caller as-is.

use thiserror::Error;

use crate::http::TransportError;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, EmarsysError>;

/// Top-level error returned by every client operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmarsysError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

impl EmarsysError {
    pub fn is_client(&self) -> bool {
        matches!(self, EmarsysError::Client(_))
    }

    pub fn is_server(&self) -> bool {
        matches!(self, EmarsysError::Server(_))
    }

    /// The `replyCode` mirrored into the error, if any.
    pub fn reply_code(&self) -> Option<i64> {
        match self {
            EmarsysError::Client(err) => err.reply_code(),
            EmarsysError::Server(_) => None,
        }
    }
}

/// Caller-attributable failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("Unrecognized field name \"{field}\"")]
    FieldNotFound { field: String },

    #[error("Unrecognized field \"{field}\" for choice \"{choice}\"")]
    ChoiceFieldNotFound { field: String, choice: String },

    #[error("Unrecognized choice \"{choice}\" for field \"{field}\"")]
    ChoiceNotFound { choice: String, field: String },

    #[error("Unexpected response structure, no replyCode or replyText")]
    InvalidEnvelope,

    #[error("JSON response could not be decoded, maximum depth reached.")]
    DepthExceeded,

    /// The transport rejected the request before it reached the service.
    #[error("{message}")]
    Transport { message: String },

    /// An envelope came back without the data the operation needs.
    #[error("{text}")]
    Reply { code: i64, text: String },

    #[error("Can't create this type of field, system type.")]
    SystemFieldType,

    #[error("This type of field cannot be created via API. {application_type}")]
    FieldTypeNotCreatable { application_type: String },

    #[error("request body could not be serialized: {message}")]
    Serialization { message: String },
}

impl ClientError {
    pub fn reply_code(&self) -> Option<i64> {
        match self {
            ClientError::Reply { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Service- or network-attributable failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServerError {
    #[error("{message}")]
    Transport { message: String },

    #[error("JSON response could not be decoded:\n{message}")]
    Decode { message: String },

    #[error("JSON response is not an array:\n{body}")]
    NotAStructure { body: String },
}

impl From<TransportError> for EmarsysError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Protocol(message) => ClientError::Transport { message }.into(),
            TransportError::Network(message) => ServerError::Transport { message }.into(),
        }
    }
}
