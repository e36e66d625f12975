//! REST client: configuration, request building and API classes.
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── config      - ClientConfig
//! ├── rest_client - RestClient and WeakClient
//! ├── builder     - RequestBuilder
//! ├── class       - RestClass, path-scoped calls
//! ├── registry    - thread-local named clients
//! ├── simple      - summaries with a link to the full object
//! └── utils       - retry helpers
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RestClient`] | Shared context: base URL, transport, serializer, paging factory |
//! | [`RequestBuilder`] | URL, headers and body of one request |
//! | [`RestClass`] | Calls below a fixed path |
//! | [`ClientConfig`] | Client configuration options |
//! | [`Simple`] | Summary type that fetches and caches its full version |
//!
//! # Examples
//!
//! ## Creating a Client
//!
//! ```
//! use rest_client_http::client::{ClientConfig, RestClient};
//! use rest_client_http::DataMode;
//!
//! let client = RestClient::new(ClientConfig {
//!     data_mode: DataMode::Cbor,
//!     request_timeout_ms: 5_000,
//!     ..ClientConfig::new("https://api.example.com")
//! })
//! .unwrap();
//! assert_eq!(client.data_mode(), DataMode::Cbor);
//! ```
//!
//! ## Utility Functions
//!
//! ```
//! use rest_client_http::client::{exponential_backoff, is_retryable_status};
//! use std::time::Duration;
//!
//! assert!(is_retryable_status(503));
//! assert!(!is_retryable_status(404));
//!
//! let delay = exponential_backoff(2, 100);
//! assert_eq!(delay, Duration::from_millis(400));
//! ```

mod builder;
mod class;
mod config;
mod registry;
mod rest_client;
mod simple;
mod utils;

pub use builder::RequestBuilder;
pub use class::RestClass;
pub use config::ClientConfig;
pub use registry::{
    add_global_api, api_client, api_root_class, create_api_class, registered_apis,
    remove_global_api,
};
pub use rest_client::{RestClient, WeakClient};
pub use simple::{Extension, Simple};
pub use utils::*;
