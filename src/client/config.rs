//! Client configuration.

use crate::types::DataMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration of a [`RestClient`](super::RestClient).
///
/// Can be built with struct update syntax or loaded from JSON; missing
/// fields take their defaults.
///
/// ```
/// use rest_client_http::client::ClientConfig;
/// use rest_client_http::DataMode;
///
/// let config: ClientConfig = serde_json::from_str(
///     r#"{ "base_url": "https://api.example.com", "api_version": "2", "data_mode": "cbor" }"#,
/// ).unwrap();
/// assert_eq!(config.data_mode, DataMode::Cbor);
/// assert_eq!(config.request_timeout_ms, 30_000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root URL every request is resolved against.
    pub base_url: String,
    /// API version inserted as a `v{version}` path segment, if any.
    pub api_version: Option<String>,
    /// Encoding of request bodies and the `Accept` header.
    pub data_mode: DataMode,
    /// Headers added to every request.
    pub global_headers: BTreeMap<String, String>,
    /// Query parameters added to every request.
    pub global_parameters: Vec<(String, String)>,
    /// Run transport sends on the runtime worker pool instead of the local task.
    pub threaded: bool,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Idle connections kept per host.
    pub max_idle_per_host: usize,
    /// Proxy for all requests, empty for none.
    pub proxy_url: String,
    /// User agent, empty for the reqwest default.
    pub user_agent: String,
    /// Log transport failures and response summaries.
    pub enable_logging: bool,
}

impl ClientConfig {
    /// Default configuration pointing at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost/".to_string(),
            api_version: None,
            data_mode: DataMode::Json,
            global_headers: BTreeMap::new(),
            global_parameters: Vec::new(),
            threaded: false,
            request_timeout_ms: 30_000,
            max_idle_per_host: 32,
            proxy_url: String::new(),
            user_agent: concat!("rest_client_http/", env!("CARGO_PKG_VERSION")).to_string(),
            enable_logging: true,
        }
    }
}
