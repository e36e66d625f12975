use bytes::Bytes;
use http::Method;
use std::collections::BTreeMap;
use url::Url;

/// A fully built request, ready to be handed to a transport.
///
/// A reply keeps its request so that a retry re-dispatches the identical
/// verb, URL, headers and body.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// HTTP verb.
    pub method: Method,
    /// Absolute request URL.
    pub url: Url,
    /// Header map with lower-case names.
    pub headers: BTreeMap<String, String>,
    /// Request body, empty for none.
    pub body: Bytes,
}

impl HttpRequest {
    /// Create a request without headers or body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: BTreeMap::new(),
            body: Bytes::new(),
        }
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

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}
