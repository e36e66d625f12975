//! Body codecs.
//!
//! Decoding turns a response body into a [`Data`] value based on its
//! `Content-Type`. Encoding does the reverse for request bodies.

use super::headers::{is_cbor_media_type, is_json_media_type, parse_media_type};
use super::media_types;
use crate::error::Result;
use crate::types::Data;
use bytes::Bytes;
use serde_json::error::Category;
use thiserror::Error;

/// A response body that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseFailure {
    /// One of the associated code constants.
    pub code: i32,
    /// Decoder message.
    pub message: String,
}

impl ParseFailure {
    /// Reading the JSON input failed.
    pub const JSON_IO: i32 = 1;
    /// The JSON text is malformed.
    pub const JSON_SYNTAX: i32 = 2;
    /// The JSON text is well formed but semantically invalid.
    pub const JSON_DATA: i32 = 3;
    /// The JSON text ended early.
    pub const JSON_EOF: i32 = 4;
    /// The CBOR input could not be decoded.
    pub const CBOR: i32 = 10;
    /// The body has a content type the pipeline does not understand.
    pub const UNSUPPORTED_CONTENT_TYPE: i32 = 20;

    fn from_json(err: &serde_json::Error) -> Self {
        let code = match err.classify() {
            Category::Io => Self::JSON_IO,
            Category::Syntax => Self::JSON_SYNTAX,
            Category::Data => Self::JSON_DATA,
            Category::Eof => Self::JSON_EOF,
        };
        Self {
            code,
            message: err.to_string(),
        }
    }

    fn unsupported(content_type: &str) -> Self {
        Self {
            code: Self::UNSUPPORTED_CONTENT_TYPE,
            message: format!("Unsupported content type: {}", content_type),
        }
    }
}

/// Decode a response body according to its `Content-Type`.
///
/// CBOR and JSON are supported. A JSON body that fails with a syntax error is
/// parsed a second time wrapped in `[` `]`, which recovers comma separated
/// fragments; a single recovered element is returned unwrapped. If the second
/// attempt fails too, the first error is reported.
///
/// # Errors
///
/// Returns a [`ParseFailure`] for undecodable bodies and for any other
/// content type, including a missing header.
pub fn decode_body(content_type: Option<&str>, body: &[u8]) -> std::result::Result<Data, ParseFailure> {
    let media_type = parse_media_type(content_type.unwrap_or_default());

    if is_cbor_media_type(&media_type) {
        serde_cbor::from_slice::<serde_cbor::Value>(body)
            .map(Data::Cbor)
            .map_err(|e| ParseFailure {
                code: ParseFailure::CBOR,
                message: e.to_string(),
            })
    } else if is_json_media_type(&media_type) {
        decode_json(body)
    } else {
        Err(ParseFailure::unsupported(content_type.unwrap_or_default()))
    }
}

fn decode_json(body: &[u8]) -> std::result::Result<Data, ParseFailure> {
    let err = match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => return Ok(Data::Json(value)),
        Err(err) => err,
    };

    if err.classify() != Category::Syntax {
        return Err(ParseFailure::from_json(&err));
    }

    let mut wrapped = Vec::with_capacity(body.len() + 2);
    wrapped.push(b'[');
    wrapped.extend_from_slice(body);
    wrapped.push(b']');

    match serde_json::from_slice::<serde_json::Value>(&wrapped) {
        Ok(serde_json::Value::Array(mut values)) if values.len() == 1 => {
            Ok(Data::Json(values.remove(0)))
        }
        Ok(value) => {
            tracing::debug!("recovered JSON fragment body after: {}", err);
            Ok(Data::Json(value))
        }
        Err(_) => Err(ParseFailure::from_json(&err)),
    }
}

/// Encode a structured value as a request body.
///
/// Returns the bytes together with the media type to send. [`Data::Empty`]
/// encodes to an empty JSON body.
pub fn encode_body(data: &Data) -> Result<(Bytes, &'static str)> {
    match data {
        Data::Empty => Ok((Bytes::new(), media_types::JSON)),
        Data::Json(value) => Ok((Bytes::from(serde_json::to_vec(value)?), media_types::JSON)),
        Data::Cbor(value) => Ok((Bytes::from(serde_cbor::to_vec(value)?), media_types::CBOR)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_json_object() {
        let data = decode_body(Some("application/json; charset=utf-8"), br#"{"a": [1, 2]}"#).unwrap();
        assert_eq!(data, Data::Json(json!({"a": [1, 2]})));
    }

    #[test]
    fn test_decode_json_scalar() {
        let data = decode_body(Some("application/json"), b"42").unwrap();
        assert_eq!(data, Data::Json(json!(42)));
    }

    #[test]
    fn test_decode_json_fragment_recovered_as_array() {
        let data = decode_body(Some("application/json"), br#""a", "b""#).unwrap();
        assert_eq!(data, Data::Json(json!(["a", "b"])));
    }

    #[test]
    fn test_decode_json_garbage_keeps_first_error() {
        let err = decode_body(Some("application/json"), b"hello world").unwrap_err();
        assert_eq!(err.code, ParseFailure::JSON_SYNTAX);
    }

    #[test]
    fn test_decode_empty_json_is_eof() {
        let err = decode_body(Some("application/json"), b"").unwrap_err();
        assert_eq!(err.code, ParseFailure::JSON_EOF);
    }

    #[test]
    fn test_decode_cbor() {
        let bytes = serde_cbor::to_vec(&vec![1u32, 2, 3]).unwrap();
        let data = decode_body(Some("application/cbor"), &bytes).unwrap();
        assert_eq!(data.array_len(), Some(3));

        let err = decode_body(Some("application/cbor"), &[0xff, 0x00]).unwrap_err();
        assert_eq!(err.code, ParseFailure::CBOR);
    }

    #[test]
    fn test_decode_unsupported_content_type() {
        let err = decode_body(Some("text/plain"), b"hello").unwrap_err();
        assert_eq!(err.code, ParseFailure::UNSUPPORTED_CONTENT_TYPE);
        assert!(err.message.contains("text/plain"));
        let boxed: Box<dyn std::error::Error> = Box::new(err.clone());
        assert_eq!(boxed.to_string(), err.message);

        let err = decode_body(None, b"hello").unwrap_err();
        assert_eq!(err.code, ParseFailure::UNSUPPORTED_CONTENT_TYPE);
    }

    #[test]
    fn test_encode_body() {
        let (body, content_type) = encode_body(&Data::Json(json!({"id": 1}))).unwrap();
        assert_eq!(content_type, "application/json");
        assert_eq!(&body[..], br#"{"id":1}"#);

        let (body, content_type) =
            encode_body(&Data::Cbor(serde_cbor::Value::Integer(7))).unwrap();
        assert_eq!(content_type, "application/cbor");
        assert_eq!(&body[..], &[0x07]);
    }
}
