//! Helpers shared by the unit tests.

use crate::client::{ClientConfig, RestClient};
use crate::transport::MockTransport;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub(crate) const BASE_URL: &str = "http://api.test/";

pub(crate) fn mock_client() -> (RestClient, Arc<MockTransport>) {
    mock_client_with(ClientConfig::new(BASE_URL))
}

pub(crate) fn mock_client_with(config: ClientConfig) -> (RestClient, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::new());
    let client = RestClient::with_transport(config, transport.clone()).unwrap();
    (client, transport)
}

/// Run a future inside a fresh `LocalSet`, which replies need for delivery.
pub(crate) async fn run_local<F: Future>(future: F) -> F::Output {
    tokio::task::LocalSet::new().run_until(future).await
}

/// Poll `condition` while letting local tasks run, panicking after about a second.
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition was not reached in time");
}

/// Give pending local tasks time to run, for asserting that nothing else happens.
pub(crate) async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}
