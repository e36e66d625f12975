//! Wire-level constants, header parsing and body codecs.
//!
//! # Module Organization
//!
//! ```text
//! protocol/
//! ├── headers - header names and media type parsing
//! └── codec   - body decoding into Data and encoding of request bodies
//! ```
//!
//! # Examples
//!
//! ```
//! use rest_client_http::protocol::{decode_body, parse_media_type};
//! use rest_client_http::Data;
//!
//! assert_eq!(parse_media_type("Application/JSON; charset=utf-8"), "application/json");
//!
//! let data = decode_body(Some("application/json"), br#"{"id": 1}"#).unwrap();
//! assert!(matches!(data, Data::Json(_)));
//! ```

pub mod codec;
pub mod headers;

pub use codec::{decode_body, encode_body, ParseFailure};
pub use headers::{is_cbor_media_type, is_json_media_type, parse_media_type};

/// Media types understood by the reply pipeline.
pub mod media_types {
    /// JSON bodies.
    pub const JSON: &str = "application/json";
    /// CBOR bodies.
    pub const CBOR: &str = "application/cbor";
    /// Form encoded POST parameters.
    pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
}
