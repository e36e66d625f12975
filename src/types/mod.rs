//! Core value and wire types.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Data`] | Structured value parsed from a body (JSON, CBOR or empty) |
//! | [`DataMode`] | Encoding used for request bodies |
//! | [`HttpRequest`] | Fully built request handed to a transport |
//! | [`RawResponse`] | What a transport hands back |
//! | [`TransportError`] | Network-level failure reported by a transport |

mod data;
mod request;
mod response;

pub use data::{Data, DataMode};
pub use request::HttpRequest;
pub use response::{RawResponse, TransportError};
