//! Request construction.

use super::rest_client::RestClient;
use crate::error::Result;
use crate::protocol::{encode_body, headers, media_types};
use crate::reply::{GenericReply, PagingReply, Reply, VoidReply};
use crate::types::{Data, HttpRequest};
use bytes::Bytes;
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use url::Url;

/// Builds a request URL and the request around it.
///
/// Obtained from [`RestClient::builder`] or [`RestClass::builder`](super::RestClass::builder),
/// already carrying the client's base URL, API version, global headers,
/// global parameters and `Accept` header. The final URL is
///
/// ```text
/// {base}/v{version}/{path...}[/]?{query}#{fragment}
/// ```
///
/// # Examples
///
/// ```
/// use rest_client_http::{ClientConfig, RestClient};
///
/// let client = RestClient::new(ClientConfig::new("https://api.example.com")).unwrap();
/// let request = client
///     .builder()
///     .add_path("users/42/posts")
///     .add_parameter("limit", "10")
///     .trailing_slash(true)
///     .build();
///
/// assert_eq!(request.url.as_str(), "https://api.example.com/users/42/posts/?limit=10");
/// assert_eq!(request.header("accept"), Some("application/json"));
/// ```
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    client: RestClient,
    base: Url,
    version: Option<String>,
    user: Option<String>,
    password: Option<String>,
    path: Vec<String>,
    trailing_slash: bool,
    query: Vec<(String, String)>,
    fragment: Option<String>,
    headers: BTreeMap<String, String>,
    body: Bytes,
    post_parameters: Vec<(String, String)>,
    method: Method,
}

impl RequestBuilder {
    pub(crate) fn new(client: RestClient) -> Self {
        let mut base = client.base_url().clone();
        let mut query: Vec<(String, String)> = base.query_pairs().into_owned().collect();
        let fragment = base.fragment().map(str::to_string);
        base.set_query(None);
        base.set_fragment(None);

        let config = client.config();
        query.extend(config.global_parameters.iter().cloned());
        let global_headers = config.global_headers.clone();
        let version = config.api_version.clone();
        let accept = client.data_mode().content_type();

        let builder = Self {
            client,
            base,
            version: None,
            user: None,
            password: None,
            path: Vec::new(),
            trailing_slash: false,
            query,
            fragment,
            headers: BTreeMap::new(),
            body: Bytes::new(),
            post_parameters: Vec::new(),
            method: Method::GET,
        }
        .add_headers(global_headers)
        .with_accept(accept);

        match version {
            Some(version) => builder.with_version(&version),
            None => builder,
        }
    }

    /// The client requests are sent through.
    pub fn client(&self) -> &RestClient {
        &self.client
    }

    /// The HTTP method, `GET` unless changed.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Set the API version, inserted as `v{version}` after the base path.
    ///
    /// Dotted versions are normalized by dropping trailing zero components,
    /// so `"1.0"` becomes `v1`. An empty string removes the segment.
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = normalize_version(version);
        self
    }

    /// Append path segments; `path` is split on `/` and empty pieces are skipped.
    pub fn add_path(mut self, path: &str) -> Self {
        self.path.extend(
            path.split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string),
        );
        self
    }

    /// Append path segments verbatim.
    pub fn add_paths<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.path.extend(segments.into_iter().map(Into::into));
        self
    }

    /// End the path with `/`.
    pub fn trailing_slash(mut self, enabled: bool) -> Self {
        self.trailing_slash = enabled;
        self
    }

    /// Append a query parameter.
    pub fn add_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Append several query parameters.
    pub fn add_parameters<I, K, V>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(parameters.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set the URL fragment.
    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = Some(fragment.into());
        self
    }

    /// Set a header, replacing an earlier value. Names are stored lower-case.
    pub fn add_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Set several headers.
    pub fn add_headers<I, K, V>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        headers
            .into_iter()
            .fold(self, |builder, (name, value)| builder.add_header(name.as_ref(), value))
    }

    /// Put user and password into the URL.
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Set the `Accept` header.
    pub fn with_accept(self, media_type: &str) -> Self {
        self.add_header(headers::ACCEPT, media_type)
    }

    /// Set a raw body with its content type; also used as `Accept`.
    ///
    /// Clears any form parameters.
    pub fn with_body(self, body: impl Into<Bytes>, content_type: &str) -> Self {
        let mut builder = self
            .add_header(headers::CONTENT_TYPE, content_type)
            .with_accept(content_type);
        builder.body = body.into();
        builder.post_parameters.clear();
        builder
    }

    /// Encode a structured value as the body.
    ///
    /// # Errors
    ///
    /// Fails if the value cannot be encoded.
    pub fn with_data(self, data: &Data) -> Result<Self> {
        let (body, content_type) = encode_body(data)?;
        Ok(self.with_body(body, content_type))
    }

    /// Serialize `value` with the client's serializer and use it as the body.
    ///
    /// # Errors
    ///
    /// Fails if the value cannot be serialized.
    pub fn with_serialized<B: Serialize + ?Sized>(self, value: &B) -> Result<Self> {
        let data = self.client.serializer().serialize(value)?;
        self.with_data(&data)
    }

    /// Add a form parameter; the body becomes `application/x-www-form-urlencoded`.
    pub fn add_post_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.post_parameters.push((name.into(), value.into()));
        self.body = Bytes::new();
        self.add_header(headers::CONTENT_TYPE, media_types::FORM_URLENCODED)
    }

    /// Add several form parameters.
    pub fn add_post_parameters<I, K, V>(self, parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        parameters
            .into_iter()
            .fold(self, |builder, (name, value)| builder.add_post_parameter(name, value))
    }

    /// Set the HTTP method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Re-target the builder at `url`, resolved against the current URL.
    ///
    /// Version, credentials and path are reset since the resolved URL
    /// already contains them. The query of `url` is appended to the current
    /// parameters with `merge_query`, otherwise it replaces them. Unless
    /// `keep_fragment` is set the fragment comes from `url`.
    ///
    /// # Errors
    ///
    /// Fails if `url` cannot be resolved.
    pub fn update_from_relative_url(
        mut self,
        url: &str,
        merge_query: bool,
        keep_fragment: bool,
    ) -> Result<Self> {
        let current = self.build_url();
        let mut resolved = current.join(url)?;
        if resolved.host_str() != current.host_str() {
            tracing::warn!(
                "URL host changed from {} to {}",
                current.host_str().unwrap_or_default(),
                resolved.host_str().unwrap_or_default()
            );
        }

        let relative_query: Vec<(String, String)> = if url.contains('?') {
            resolved.query_pairs().into_owned().collect()
        } else {
            Vec::new()
        };
        let relative_fragment = resolved.fragment().map(str::to_string);
        resolved.set_query(None);
        resolved.set_fragment(None);

        self.base = resolved;
        self.version = None;
        self.user = None;
        self.password = None;
        self.path.clear();
        if merge_query {
            self.query.extend(relative_query);
        } else {
            self.query = relative_query;
        }
        if !keep_fragment {
            self.fragment = relative_fragment;
        }
        Ok(self)
    }

    /// The URL the request will be sent to.
    pub fn build_url(&self) -> Url {
        let mut url = self.base.clone();
        let base_path = self
            .base
            .path()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        url.set_path(&base_path);

        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(self.version.iter().map(|version| format!("v{}", version)))
                .extend(&self.path);
        }
        if self.trailing_slash && !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        if let Some(user) = &self.user {
            let _ = url.set_username(user);
        }
        if let Some(password) = &self.password {
            let _ = url.set_password(Some(password));
        }
        if !self.query.is_empty() {
            url.query_pairs_mut().clear().extend_pairs(&self.query);
        }
        url.set_fragment(self.fragment.as_deref());

        tracing::trace!("Built URL with path {}", url.path());
        url
    }

    /// Assemble the request without sending it.
    pub fn build(&self) -> HttpRequest {
        let mut request = HttpRequest::new(self.method.clone(), self.build_url());
        request.headers = self.headers.clone();

        let is_form = self.headers.get(headers::CONTENT_TYPE).map(String::as_str)
            == Some(media_types::FORM_URLENCODED);
        request.body = if !self.body.is_empty() {
            self.body.clone()
        } else if is_form && !self.post_parameters.is_empty() {
            url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&self.post_parameters)
                .finish()
                .into()
        } else {
            Bytes::new()
        };

        tracing::debug!(
            "Created {} request with headers {:?}",
            request.method,
            request.headers.keys().collect::<Vec<_>>()
        );
        request
    }

    /// Send the request.
    pub fn send(&self) -> Reply {
        Reply::dispatch(
            self.client.transport(),
            self.build(),
            self.client.config().threaded,
        )
    }

    /// Send the request, decoding the reply as `D` (success) or `E` (failure).
    pub fn send_generic<D, E>(&self) -> GenericReply<D, E>
    where
        D: DeserializeOwned + Default + 'static,
        E: DeserializeOwned + Default + 'static,
    {
        GenericReply::new(self.send(), self.client.clone())
    }

    /// Send a request whose success carries no body.
    pub fn send_void<E>(&self) -> VoidReply<E>
    where
        E: DeserializeOwned + Default + 'static,
    {
        VoidReply::new(self.send(), self.client.clone())
    }

    /// Send a request for one page of `T` items.
    pub fn send_paging<T, E>(&self) -> PagingReply<T, E>
    where
        T: DeserializeOwned + 'static,
        E: DeserializeOwned + Default + 'static,
    {
        PagingReply::new(self.send(), self.client.clone())
    }
}

/// `"1.0"` → `"1"`, `"2.1.0"` → `"2.1"`; non-numeric versions are kept.
fn normalize_version(version: &str) -> Option<String> {
    let version = version.trim().trim_start_matches(['v', 'V']);
    if version.is_empty() {
        return None;
    }

    let parts: Vec<&str> = version.split('.').collect();
    if parts.iter().any(|part| part.parse::<u64>().is_err()) {
        return Some(version.to_string());
    }

    let numbers: Vec<u64> = parts.iter().filter_map(|part| part.parse().ok()).collect();
    let keep = numbers
        .iter()
        .rposition(|&n| n != 0)
        .map_or(1, |last| last + 1);
    Some(
        numbers[..keep]
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join("."),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;
    use crate::testing::{mock_client, mock_client_with};
    use crate::types::DataMode;
    use serde::Serialize;
    use serde_json::json;

    fn client_with(config: ClientConfig) -> RestClient {
        mock_client_with(config).0
    }

    #[test]
    fn test_normalize_version() {
        assert_eq!(normalize_version("1.0").as_deref(), Some("1"));
        assert_eq!(normalize_version("2.1.0").as_deref(), Some("2.1"));
        assert_eq!(normalize_version("v3").as_deref(), Some("3"));
        assert_eq!(normalize_version("0").as_deref(), Some("0"));
        assert_eq!(normalize_version("beta").as_deref(), Some("beta"));
        assert_eq!(normalize_version(""), None);
    }

    #[test]
    fn test_url_composition() {
        let client = client_with(ClientConfig {
            api_version: Some("1.0".into()),
            global_parameters: vec![("lang".into(), "en".into())],
            ..ClientConfig::new("http://api.test/root/?key=abc#top")
        });

        let url = client
            .builder()
            .add_path("/users//42/")
            .add_paths(["posts"])
            .add_parameter("page", "2")
            .trailing_slash(true)
            .build_url();
        assert_eq!(
            url.as_str(),
            "http://api.test/root/v1/users/42/posts/?key=abc&lang=en&page=2#top"
        );
    }

    #[test]
    fn test_path_segments_are_encoded() {
        let (client, _) = mock_client();
        let url = client.builder().add_paths(["a b", "c/d"]).build_url();
        assert_eq!(url.path(), "/a%20b/c%2Fd");
    }

    #[test]
    fn test_credentials_and_fragment() {
        let (client, _) = mock_client();
        let url = client
            .builder()
            .with_credentials("user", "secret")
            .with_fragment("section")
            .build_url();
        assert_eq!(url.username(), "user");
        assert_eq!(url.password(), Some("secret"));
        assert_eq!(url.fragment(), Some("section"));
    }

    #[test]
    fn test_headers_and_accept() {
        let client = client_with(ClientConfig {
            global_headers: BTreeMap::from([("X-Api-Key".to_string(), "k".to_string())]),
            data_mode: DataMode::Cbor,
            ..ClientConfig::new("http://api.test/")
        });
        let request = client.builder().add_header("X-Trace", "1").build();
        assert_eq!(request.header("x-api-key"), Some("k"));
        assert_eq!(request.header("X-Trace"), Some("1"));
        assert_eq!(request.header("accept"), Some(media_types::CBOR));
    }

    #[test]
    fn test_serialized_body() {
        #[derive(Serialize)]
        struct NewPost<'a> {
            title: &'a str,
        }

        let (client, _) = mock_client();
        let request = client
            .builder()
            .with_method(Method::POST)
            .with_serialized(&NewPost { title: "hi" })
            .unwrap()
            .build();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.header("content-type"), Some(media_types::JSON));
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&request.body).unwrap(),
            json!({"title": "hi"})
        );
    }

    #[test]
    fn test_post_parameters_replace_body() {
        let (client, _) = mock_client();
        let request = client
            .builder()
            .with_body("raw", "text/plain")
            .add_post_parameters([("a", "1"), ("b", "x y")])
            .build();
        assert_eq!(request.header("content-type"), Some(media_types::FORM_URLENCODED));
        assert_eq!(&request.body[..], b"a=1&b=x+y");
    }

    #[test]
    fn test_body_clears_post_parameters() {
        let (client, _) = mock_client();
        let request = client
            .builder()
            .add_post_parameter("a", "1")
            .with_body("{}", media_types::JSON)
            .build();
        assert_eq!(&request.body[..], b"{}");
        assert_eq!(request.header("content-type"), Some(media_types::JSON));
    }

    #[test]
    fn test_update_from_relative_url() {
        let client = client_with(ClientConfig {
            api_version: Some("2".into()),
            global_parameters: vec![("lang".into(), "en".into())],
            ..ClientConfig::new("http://api.test/root")
        });

        let merged = client
            .builder()
            .add_path("items")
            .update_from_relative_url("/items?offset=10", true, false)
            .unwrap()
            .build_url();
        assert_eq!(merged.as_str(), "http://api.test/items?lang=en&offset=10");

        let replaced = client
            .builder()
            .add_path("items")
            .update_from_relative_url("?offset=20", false, false)
            .unwrap()
            .build_url();
        assert_eq!(replaced.as_str(), "http://api.test/root/v2/items?offset=20");

        let absolute = client
            .builder()
            .update_from_relative_url("https://other.test/list#end", false, false)
            .unwrap()
            .build_url();
        assert_eq!(absolute.as_str(), "https://other.test/list#end");
    }
}
