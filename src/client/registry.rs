//! Named clients shared across a thread.
//!
//! Clients are `Rc`-based, so the registry is per thread; register a client
//! on the thread that drives its `LocalSet`.

use super::class::RestClass;
use super::rest_client::RestClient;
use crate::error::{RestError, Result};
use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    static GLOBAL_APIS: RefCell<HashMap<String, RestClient>> = RefCell::new(HashMap::new());
}

/// Register `client` under `name`.
///
/// # Errors
///
/// [`RestError::Registry`] if the name is taken.
pub fn add_global_api(name: &str, client: RestClient) -> Result<()> {
    GLOBAL_APIS.with(|apis| {
        let mut apis = apis.borrow_mut();
        if apis.contains_key(name) {
            return Err(RestError::Registry(name.to_string()));
        }
        tracing::debug!("Registered global API {}", name);
        apis.insert(name.to_string(), client);
        Ok(())
    })
}

/// Unregister `name`, handing back its client.
pub fn remove_global_api(name: &str) -> Option<RestClient> {
    GLOBAL_APIS.with(|apis| apis.borrow_mut().remove(name))
}

/// The client registered under `name`.
pub fn api_client(name: &str) -> Option<RestClient> {
    GLOBAL_APIS.with(|apis| apis.borrow().get(name).cloned())
}

/// The root class of the API registered under `name`.
pub fn api_root_class(name: &str) -> Option<RestClass> {
    api_client(name).map(|client| client.root_class())
}

/// A class for `path` of the API registered under `name`.
pub fn create_api_class(name: &str, path: &str) -> Option<RestClass> {
    api_client(name).map(|client| client.create_class(path))
}

/// Names of all registered APIs, sorted.
pub fn registered_apis() -> Vec<String> {
    GLOBAL_APIS.with(|apis| {
        let mut names: Vec<String> = apis.borrow().keys().cloned().collect();
        names.sort();
        names
    })
}
