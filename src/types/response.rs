use crate::protocol::{headers, media_types};
use bytes::Bytes;
use std::collections::BTreeMap;
use thiserror::Error;

/// Network-level failure reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (code {code})")]
pub struct TransportError {
    /// Numeric error code. HTTP error statuses are reported with the status itself.
    pub code: i32,
    /// Human readable description.
    pub message: String,
}

impl TransportError {
    /// Unclassified failure.
    pub const UNKNOWN: i32 = 1;
    /// Connection could not be established.
    pub const CONNECT: i32 = 2;
    /// The request timed out.
    pub const TIMEOUT: i32 = 3;
    /// The request was aborted by the caller.
    pub const CANCELED: i32 = 5;
    /// Redirect policy violated.
    pub const REDIRECT: i32 = 6;
    /// The request could not be sent.
    pub const REQUEST: i32 = 7;
    /// The response body could not be read.
    pub const BODY: i32 = 8;

    /// Create a transport error.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The error reported for an aborted request.
    pub fn canceled() -> Self {
        Self::new(Self::CANCELED, "Operation canceled")
    }
}

/// What a transport hands back once a request finished.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawResponse {
    /// HTTP status code, 0 if no response was received.
    pub status: u16,
    /// Response headers with lower-case names.
    pub headers: BTreeMap<String, String>,
    /// Raw body bytes.
    pub body: Bytes,
    /// Set when the transport failed.
    pub transport_error: Option<TransportError>,
}

impl RawResponse {
    /// Response with a status and no body.
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    /// Response with a JSON body.
    pub fn json(status: u16, body: impl Into<Bytes>) -> Self {
        Self::empty(status)
            .with_header(headers::CONTENT_TYPE, media_types::JSON)
            .with_body(body)
    }

    /// Response with a CBOR body.
    pub fn cbor(status: u16, body: impl Into<Bytes>) -> Self {
        Self::empty(status)
            .with_header(headers::CONTENT_TYPE, media_types::CBOR)
            .with_body(body)
    }

    /// Response that carries only a transport failure.
    pub fn from_transport_error(error: TransportError) -> Self {
        Self {
            transport_error: Some(error),
            ..Default::default()
        }
    }

    /// Response produced when the caller aborted the request.
    pub fn canceled() -> Self {
        Self::from_transport_error(TransportError::canceled())
    }

    /// Add a header. Names are stored lower-case.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Attach a transport failure.
    pub fn with_transport_error(mut self, error: TransportError) -> Self {
        self.transport_error = Some(error);
        self
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The raw `Content-Type` header.
    pub fn content_type(&self) -> Option<&str> {
        self.header(headers::CONTENT_TYPE)
    }
}
