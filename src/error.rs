//! Error types for the REST client.
//!
//! Errors that can be returned synchronously (building URLs, serializing
//! request bodies, creating a client) use [`RestError`]. Everything that
//! happens after a request was dispatched is reported through reply
//! callbacks instead and never crosses the asynchronous boundary as a
//! `Result`; see [`crate::reply::ErrorKind`].

use thiserror::Error;

/// Result alias used by the synchronous parts of the crate.
pub type Result<T> = std::result::Result<T, RestError>;

/// Errors returned by client, builder and serializer operations.
#[derive(Debug, Error)]
pub enum RestError {
    /// A URL could not be parsed or resolved.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A typed value could not be converted into a structured value or body.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A structured value did not match the requested type.
    #[error(transparent)]
    Deserialization(#[from] DeserializationError),

    /// The underlying HTTP client could not be created.
    #[error("HTTP client error: {0}")]
    Http(String),

    /// An API name is already registered, or no client is registered under it.
    #[error("unknown or duplicate API: {0}")]
    Registry(String),
}

impl RestError {
    /// Whether the error came from converting between typed and structured values.
    pub fn is_serialization(&self) -> bool {
        matches!(self, RestError::Serialization(_) | RestError::Deserialization(_))
    }
}

impl From<serde_json::Error> for RestError {
    fn from(err: serde_json::Error) -> Self {
        RestError::Serialization(err.to_string())
    }
}

impl From<serde_cbor::Error> for RestError {
    fn from(err: serde_cbor::Error) -> Self {
        RestError::Serialization(err.to_string())
    }
}

/// A structured value could not be converted into the requested type.
///
/// Raised by the serializer and by paging factories when a page envelope
/// does not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DeserializationError {
    message: String,
}

impl DeserializationError {
    /// Create an error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}
