//! The client context shared by builders, classes, replies and pages.

use super::builder::RequestBuilder;
use super::class::RestClass;
use super::config::ClientConfig;
use crate::error::{RestError, Result};
use crate::paging::{PagingFactory, StandardPagingFactory};
use crate::serializer::Serializer;
use crate::transport::{ReqwestTransport, Transport};
use crate::types::DataMode;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use url::Url;

struct ClientInner {
    config: ClientConfig,
    base_url: Url,
    transport: Arc<dyn Transport>,
    serializer: Cell<Serializer>,
    paging_factory: RefCell<Rc<dyn PagingFactory>>,
}

/// Entry point for talking to one API.
///
/// Holds the base URL, global headers and parameters, the serializer and
/// the paging factory. Cloning is cheap and clones share all settings.
/// Pages keep only a [`WeakClient`].
///
/// # Examples
///
/// ```
/// use rest_client_http::{ClientConfig, RestClient};
///
/// let client = RestClient::new(ClientConfig {
///     api_version: Some("1.0".into()),
///     ..ClientConfig::new("https://api.example.com/root")
/// })
/// .unwrap();
///
/// let url = client.builder().add_path("posts/1").build_url();
/// assert_eq!(url.as_str(), "https://api.example.com/root/v1/posts/1");
/// ```
#[derive(Clone)]
pub struct RestClient {
    inner: Rc<ClientInner>,
}

/// Non-owning handle to a [`RestClient`].
#[derive(Clone)]
pub struct WeakClient {
    inner: Weak<ClientInner>,
}

impl WeakClient {
    /// The client, if it is still alive.
    pub fn upgrade(&self) -> Option<RestClient> {
        self.inner.upgrade().map(|inner| RestClient { inner })
    }
}

impl fmt::Debug for WeakClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakClient")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl RestClient {
    /// Create a client sending through reqwest.
    ///
    /// # Errors
    ///
    /// Fails if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::with_config(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client sending through `transport`.
    ///
    /// # Errors
    ///
    /// Fails if the base URL is invalid or cannot serve as a base.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(RestError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }

        tracing::debug!(
            "Created REST client for {} ({:?} mode)",
            base_url,
            config.data_mode
        );

        Ok(Self {
            inner: Rc::new(ClientInner {
                serializer: Cell::new(Serializer::new(config.data_mode)),
                paging_factory: RefCell::new(Rc::new(StandardPagingFactory)),
                config,
                base_url,
                transport,
            }),
        })
    }

    /// The configuration the client was created with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The parsed base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The transport requests are sent through.
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.inner.transport)
    }

    /// The serializer used for bodies and replies.
    pub fn serializer(&self) -> Serializer {
        self.inner.serializer.get()
    }

    /// Current body encoding.
    pub fn data_mode(&self) -> DataMode {
        self.serializer().mode()
    }

    /// Switch the body encoding for requests built from now on.
    pub fn set_data_mode(&self, mode: DataMode) {
        self.inner.serializer.set(Serializer::new(mode));
    }

    /// The factory used to recognise page envelopes.
    pub fn paging_factory(&self) -> Rc<dyn PagingFactory> {
        Rc::clone(&self.inner.paging_factory.borrow())
    }

    /// Replace the paging factory.
    pub fn set_paging_factory(&self, factory: impl PagingFactory + 'static) {
        *self.inner.paging_factory.borrow_mut() = Rc::new(factory);
    }

    /// A builder preloaded with the base URL, API version, global headers,
    /// global parameters and the `Accept` header of the data mode.
    pub fn builder(&self) -> RequestBuilder {
        RequestBuilder::new(self.clone())
    }

    /// Class at the root of the API.
    pub fn root_class(&self) -> RestClass {
        RestClass::new(self.clone(), Vec::new())
    }

    /// Class for the sub path `path`, split on `/`.
    pub fn create_class(&self, path: &str) -> RestClass {
        self.root_class().sub_class(path)
    }

    /// A weak handle to this client.
    pub fn downgrade(&self) -> WeakClient {
        WeakClient {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether both handles refer to the same client.
    pub fn ptr_eq(&self, other: &RestClient) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("data_mode", &self.data_mode())
            .field("threaded", &self.inner.config.threaded)
            .finish()
    }
}
