//! Paging walk example
//!
//! Fetches every page of a collection that uses the standard page envelope
//! and prints the items.
//!
//! Run with: cargo run --example paging_walk -- https://api.example.com items

use rest_client_http::client::is_access_denied_status;
use rest_client_http::{AwaitedError, ClientConfig, RestClient};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Clone, Deserialize)]
struct Item {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut args = std::env::args().skip(1);
    let base_url = args.next().unwrap_or_else(|| "http://localhost:3000".to_string());
    let collection = args.next().unwrap_or_else(|| "items".to_string());

    println!("Paging Walk Example");
    println!("===================\n");
    println!("Walking {}/{}", base_url.trim_end_matches('/'), collection);

    let local = tokio::task::LocalSet::new();
    local
        .run_until(async move {
            let client = RestClient::new(ClientConfig::new(base_url))?;

            let mut reply = client.create_class(&collection).get_paging::<Item, Value>("");
            let mut pages = 0;
            let mut items = 0;
            loop {
                let page = match reply.result().await {
                    Ok((_, page)) => page,
                    Err(AwaitedError::Failure { code, .. }) if is_access_denied_status(code) => {
                        anyhow::bail!("access to {} denied ({}), check the API credentials", collection, code)
                    }
                    Err(AwaitedError::Failure { code, error }) => {
                        anyhow::bail!("server answered {}: {}", code, error)
                    }
                    Err(err) => return Err(err.into()),
                };

                pages += 1;
                println!("\nPage {} (offset {}, total {}):", pages, page.offset(), page.total());
                for item in page.items() {
                    items += 1;
                    println!("  {} {}", item.id, item.name);
                }

                match page.next::<Value>() {
                    Some(next) => reply = next,
                    None => break,
                }
            }

            println!("\nDone: {} items on {} pages", items, pages);
            Ok::<(), anyhow::Error>(())
        })
        .await
}
