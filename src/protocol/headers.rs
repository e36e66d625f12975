//! Header names and media type parsing.
//!
//! Header maps throughout the crate use lower-case names, so the constants
//! here are lower-case as well.
//!
//! | Header | Used for |
//! |--------|----------|
//! | `content-type` | Body format of requests and responses |
//! | `accept` | Requested response format |
//! | `user-agent` | Set by the reqwest transport |

/// `Content-Type` header name.
pub const CONTENT_TYPE: &str = "content-type";

/// `Accept` header name.
pub const ACCEPT: &str = "accept";

/// `User-Agent` header name.
pub const USER_AGENT: &str = "user-agent";

/// Extract the bare media type from a `Content-Type` value.
///
/// Parameters such as `charset` are dropped, whitespace is trimmed and the
/// result is lower-cased.
///
/// # Examples
///
/// ```
/// use rest_client_http::protocol::parse_media_type;
///
/// assert_eq!(parse_media_type("application/json"), "application/json");
/// assert_eq!(parse_media_type(" Application/CBOR ; q=1"), "application/cbor");
/// assert_eq!(parse_media_type(""), "");
/// ```
pub fn parse_media_type(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Whether a bare media type denotes JSON.
///
/// Structured syntax suffixes (`application/problem+json`) count as JSON.
pub fn is_json_media_type(media_type: &str) -> bool {
    media_type == super::media_types::JSON || media_type.ends_with("+json")
}

/// Whether a bare media type denotes CBOR.
pub fn is_cbor_media_type(media_type: &str) -> bool {
    media_type == super::media_types::CBOR || media_type.ends_with("+cbor")
}
