//! End-to-end tests: builder, transport, reply classification, typed
//! decoding and cross-page iteration working together.

use crate::client::{add_global_api, api_client, remove_global_api, ClientConfig};
use crate::reply::{AwaitedError, ErrorKind, ErrorPolicy, ReplyState};
use crate::testing::{mock_client, mock_client_with, run_local, settle, wait_until};
use crate::transport::MockTransport;
use crate::types::{Data, DataMode, RawResponse, TransportError};
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Item {
    id: i64,
    name: String,
}

#[derive(Debug, Default, PartialEq, Deserialize)]
struct ApiError {
    message: String,
}

fn item(id: i64) -> serde_json::Value {
    json!({ "id": id, "name": format!("item-{}", id) })
}

/// A `pages` x `per_page` collection served under `/items`, `/items?offset=10`, ...
fn serve_pages(transport: &MockTransport, pages: i64, per_page: i64) {
    let total = pages * per_page;
    for page in 0..pages {
        let offset = page * per_page;
        let next = if page + 1 < pages {
            json!(format!("/items?offset={}", offset + per_page))
        } else {
            serde_json::Value::Null
        };
        let envelope = json!({
            "total": total,
            "offset": offset,
            "next": next,
            "items": (offset..offset + per_page).map(item).collect::<Vec<_>>(),
            "id": page,
        });
        let route = if page == 0 {
            "/items".to_string()
        } else {
            format!("/items?offset={}", offset)
        };
        transport.respond(Method::GET, &route, RawResponse::json(200, envelope.to_string()));
    }
}

fn record_indices() -> (Rc<RefCell<Vec<i64>>>, impl FnMut(Item, i64) -> bool + 'static) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    (seen, move |item: Item, index: i64| {
        assert_eq!(item.id, index);
        sink.borrow_mut().push(index);
        true
    })
}

#[tokio::test]
async fn test_paging_envelope_round_trip() {
    run_local(async {
        let (client, transport) = mock_client();
        transport.respond(
            Method::GET,
            "/items",
            RawResponse::json(
                200,
                json!({
                    "total": 3,
                    "offset": 0,
                    "next": "http://api.test/items?offset=3",
                    "previous": null,
                    "items": [item(0), item(1), item(2)],
                    "id": "first"
                })
                .to_string(),
            ),
        );

        let page = client
            .builder()
            .add_path("items")
            .send_paging::<Item, ApiError>()
            .result()
            .await
            .map(|(_, page)| page)
            .unwrap();

        assert_eq!(
            page.items(),
            vec![
                Item { id: 0, name: "item-0".into() },
                Item { id: 1, name: "item-1".into() },
                Item { id: 2, name: "item-2".into() },
            ]
        );
        assert_eq!(page.total(), 3);
        assert_eq!(page.offset(), 0);
        assert!(page.has_next());
        assert_eq!(page.next_url(), Some("http://api.test/items?offset=3"));
        assert!(!page.has_previous());
        assert_eq!(page.properties()["id"], Data::Json(json!("first")));
    })
    .await;
}

#[tokio::test]
async fn test_exactly_one_outcome_per_response() {
    run_local(async {
        let (client, transport) = mock_client();
        let cases = [
            ("ok", RawResponse::json(200, "{}"), "succeeded"),
            ("redirect", RawResponse::json(302, "{}"), "failed"),
            (
                "missing",
                RawResponse::json(404, r#"{"message": "x"}"#)
                    .with_transport_error(TransportError::new(404, "Not Found")),
                "failed",
            ),
            (
                "broken",
                RawResponse::empty(502)
                    .with_header("content-type", "text/html")
                    .with_body("<h1>Bad gateway</h1>")
                    .with_transport_error(TransportError::new(502, "Bad Gateway")),
                "error NetworkError",
            ),
            (
                "offline",
                RawResponse::from_transport_error(TransportError::new(
                    TransportError::CONNECT,
                    "Connection refused",
                )),
                "error NetworkError",
            ),
            ("garbage", RawResponse::json(200, "{nope"), "error ParseError"),
        ];

        for (path, response, expected) in cases {
            transport.respond(Method::GET, &format!("/{}", path), response);

            let outcomes = Rc::new(RefCell::new(Vec::new()));
            let (s, f, e) = (outcomes.clone(), outcomes.clone(), outcomes.clone());
            let reply = client.builder().add_path(path).send();
            reply
                .on_succeeded(move |_, _| s.borrow_mut().push("succeeded".to_string()))
                .on_failed(move |_, _| f.borrow_mut().push("failed".to_string()))
                .on_error(move |_, _, kind| e.borrow_mut().push(format!("error {}", kind)));

            wait_until(|| reply.is_destroyed()).await;
            assert_eq!(*outcomes.borrow(), vec![expected.to_string()], "path {}", path);
        }
    })
    .await;
}

#[tokio::test]
async fn test_empty_no_content_success() {
    run_local(async {
        let (client, transport) = mock_client();
        transport.respond(Method::DELETE, "/items/1", RawResponse::empty(204));

        let reply = client
            .builder()
            .add_path("items/1")
            .with_method(Method::DELETE)
            .send();
        reply.set_allow_empty_replies(true);
        let result = reply.result().await;
        assert_eq!(result, Ok((204, Data::Empty)));
    })
    .await;
}

#[tokio::test]
async fn test_iteration_window_within_first_page() {
    run_local(async {
        let (client, transport) = mock_client();
        let envelope = json!({
            "total": 100,
            "offset": 0,
            "next": "/items?offset=10",
            "items": (0..10).map(item).collect::<Vec<_>>(),
        });
        transport.respond(Method::GET, "/items", RawResponse::json(200, envelope.to_string()));

        let (seen, iterator) = record_indices();
        let reply = client
            .builder()
            .add_path("items")
            .send_paging::<Item, ApiError>();
        reply.iterate_range(iterator, 5, 2);

        wait_until(|| reply.reply().is_destroyed()).await;
        settle().await;
        assert_eq!(*seen.borrow(), vec![2, 3, 4]);
        assert_eq!(transport.request_count(), 1);
    })
    .await;
}

#[tokio::test]
async fn test_iteration_cancelled_on_second_page() {
    run_local(async {
        let (client, transport) = mock_client();
        serve_pages(&transport, 3, 10);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        client
            .create_class("items")
            .get_paging::<Item, ApiError>("")
            .iterate(move |item, index| {
                assert_eq!(item.id, index);
                sink.borrow_mut().push(index);
                sink.borrow().len() < 15
            });

        wait_until(|| seen.borrow().len() == 15).await;
        settle().await;
        assert_eq!(*seen.borrow(), (0..15).collect::<Vec<_>>());
        assert_eq!(transport.request_count(), 2);
        assert_eq!(transport.requests()[1].url.query(), Some("offset=10"));
    })
    .await;
}

#[tokio::test]
async fn test_iteration_spans_pages_up_to_limit() {
    run_local(async {
        let (client, transport) = mock_client();
        serve_pages(&transport, 3, 10);

        let (seen, iterator) = record_indices();
        client
            .builder()
            .add_path("items")
            .send_paging::<Item, ApiError>()
            .iterate_range(iterator, 25, 5);

        wait_until(|| seen.borrow().len() == 20).await;
        settle().await;
        assert_eq!(*seen.borrow(), (5..25).collect::<Vec<_>>());
        assert_eq!(transport.request_count(), 3);
    })
    .await;
}

#[tokio::test]
async fn test_iteration_walks_whole_collection() {
    run_local(async {
        let (client, transport) = mock_client();
        serve_pages(&transport, 3, 4);

        let (seen, iterator) = record_indices();
        client
            .builder()
            .add_path("items")
            .send_paging::<Item, ApiError>()
            .iterate(iterator);

        wait_until(|| seen.borrow().len() == 12).await;
        settle().await;
        assert_eq!(*seen.borrow(), (0..12).collect::<Vec<_>>());
        assert_eq!(transport.request_count(), 3);
    })
    .await;
}

#[tokio::test]
async fn test_cursor_pages_follow_links() {
    run_local(async {
        let (client, transport) = mock_client();
        transport
            .respond(
                Method::GET,
                "/feed",
                RawResponse::json(
                    200,
                    json!({ "next": "/feed?cursor=abc", "items": [item(1), item(2)] }).to_string(),
                ),
            )
            .respond(
                Method::GET,
                "/feed?cursor=abc",
                RawResponse::json(200, json!({ "next": null, "items": [item(3)] }).to_string()),
            );

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        client
            .builder()
            .add_path("feed")
            .send_paging::<Item, ApiError>()
            .iterate(move |item, index| {
                sink.borrow_mut().push((item.id, index));
                true
            });

        wait_until(|| seen.borrow().len() == 3).await;
        assert_eq!(*seen.borrow(), vec![(1, -1), (2, -1), (3, -1)]);
        assert_eq!(transport.request_count(), 2);
    })
    .await;
}

#[tokio::test]
async fn test_bare_relative_next_link_is_followed() {
    run_local(async {
        let (client, transport) = mock_client();
        transport
            .respond(
                Method::GET,
                "/items",
                RawResponse::json(
                    200,
                    json!({ "total": 3, "offset": 0, "next": "items?offset=2", "items": [item(0), item(1)] })
                        .to_string(),
                ),
            )
            .respond(
                Method::GET,
                "/items?offset=2",
                RawResponse::json(
                    200,
                    json!({ "total": 3, "offset": 2, "next": null, "items": [item(2)] }).to_string(),
                ),
            );

        let (seen, iterator) = record_indices();
        client
            .builder()
            .add_path("items")
            .send_paging::<Item, ApiError>()
            .iterate(iterator);

        wait_until(|| seen.borrow().len() == 3).await;
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
        assert_eq!(transport.requests_to("/items"), 2);
    })
    .await;
}

#[tokio::test]
async fn test_continuation_failure_reaches_original_handler_once() {
    run_local(async {
        let (client, transport) = mock_client();
        transport
            .respond(
                Method::GET,
                "/items",
                RawResponse::json(
                    200,
                    json!({
                        "total": 6,
                        "offset": 0,
                        "next": "/items?offset=3",
                        "items": (0..3).map(item).collect::<Vec<_>>(),
                    })
                    .to_string(),
                ),
            )
            .respond(
                Method::GET,
                "/items?offset=3",
                RawResponse::json(500, r#"{"message": "page store down"}"#),
            );

        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        let (seen, iterator) = record_indices();
        let reply = client
            .builder()
            .add_path("items")
            .send_paging::<Item, ApiError>();
        reply
            .on_all_errors_with(
                move |message, code, kind| sink.borrow_mut().push((message.to_string(), code, kind)),
                |error, _| error.message.clone(),
            )
            .iterate(iterator);

        wait_until(|| transport.request_count() == 2).await;
        settle().await;
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
        assert_eq!(errors.borrow().len(), 1);
        let (message, code, kind) = errors.borrow()[0].clone();
        assert_eq!(message, "page store down");
        assert_eq!(code, 500);
        assert_eq!(kind, ErrorKind::Failure);
    })
    .await;
}

#[tokio::test]
async fn test_unknown_content_type_is_parse_error() {
    run_local(async {
        let (client, transport) = mock_client();
        transport.respond(
            Method::GET,
            "/motd",
            RawResponse::empty(200)
                .with_header("Content-Type", "text/plain")
                .with_body("hello"),
        );

        let err = client
            .builder()
            .add_path("motd")
            .send_generic::<String, ApiError>()
            .result()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Parse));
    })
    .await;
}

#[tokio::test]
async fn test_malformed_envelope_is_deserialization_error() {
    run_local(async {
        let (client, transport) = mock_client();
        transport.respond(
            Method::GET,
            "/items",
            RawResponse::json(200, r#"{"next": null, "results": []}"#),
        );

        let errors = Rc::new(RefCell::new(Vec::new()));
        let pages = Rc::new(Cell::new(0));
        let (sink, counter) = (errors.clone(), pages.clone());
        let reply = client
            .builder()
            .add_path("items")
            .send_paging::<Item, ApiError>();
        reply
            .on_succeeded(move |_, _| counter.set(counter.get() + 1))
            .on_all_errors(move |message, _, kind| sink.borrow_mut().push((message.to_string(), kind)));

        wait_until(|| reply.reply().is_destroyed()).await;
        assert_eq!(pages.get(), 0);
        assert_eq!(
            *errors.borrow(),
            vec![(
                "Given data is not a standard paging object".to_string(),
                ErrorKind::Deserialization
            )]
        );
    })
    .await;
}

#[tokio::test]
async fn test_retry_from_failed_handler() {
    run_local(async {
        let (client, transport) = mock_client();
        transport
            .respond(Method::POST, "/items", RawResponse::json(503, r#"{"message": "busy"}"#))
            .respond(Method::POST, "/items", RawResponse::json(201, item(7).to_string()));

        let reply = client
            .create_class("items")
            .post::<Item, ApiError, _>("", &Item { id: 7, name: "item-7".into() })
            .unwrap();
        let failures = Rc::new(Cell::new(0));
        let destroyed_during_failure = Rc::new(Cell::new(false));
        {
            let handle = reply.clone();
            let failures = failures.clone();
            let destroyed = destroyed_during_failure.clone();
            reply.on_failed(move |_, error: ApiError| {
                assert_eq!(error.message, "busy");
                failures.set(failures.get() + 1);
                handle.retry();
                destroyed.set(handle.reply().is_destroyed());
            });
        }
        let created = Rc::new(RefCell::new(None));
        let sink = created.clone();
        reply.on_succeeded(move |status, item| *sink.borrow_mut() = Some((status, item)));

        wait_until(|| reply.reply().is_destroyed()).await;
        assert_eq!(failures.get(), 1);
        assert!(!destroyed_during_failure.get());
        assert_eq!(reply.state(), ReplyState::Completed);
        assert_eq!(
            *created.borrow(),
            Some((201, Item { id: 7, name: "item-7".into() }))
        );

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, requests[1].method);
        assert_eq!(requests[0].url, requests[1].url);
        assert_eq!(requests[0].body, requests[1].body);
    })
    .await;
}

#[tokio::test]
async fn test_cbor_round_trip() {
    run_local(async {
        let (client, transport) = mock_client_with(ClientConfig {
            data_mode: DataMode::Cbor,
            ..ClientConfig::new("http://api.test/")
        });
        let body = serde_cbor::to_vec(&Item { id: 3, name: "three".into() }).unwrap();
        transport.respond(Method::PUT, "/items/3", RawResponse::cbor(200, body));

        let (status, item) = client
            .create_class("items")
            .put::<Item, ApiError, _>("3", &Item { id: 3, name: "three".into() })
            .unwrap()
            .result()
            .await
            .unwrap();
        assert_eq!(status, 200);
        assert_eq!(item.name, "three");

        let requests = transport.requests();
        let request = &requests[0];
        assert_eq!(request.header("content-type"), Some("application/cbor"));
        assert_eq!(request.header("accept"), Some("application/cbor"));
        let sent: Item = serde_cbor::from_slice(&request.body).unwrap();
        assert_eq!(sent.id, 3);
    })
    .await;
}

#[tokio::test]
async fn test_plain_paging_iterate_with_policy() {
    run_local(async {
        let (client, transport) = mock_client();
        transport
            .respond(
                Method::GET,
                "/items",
                RawResponse::json(
                    200,
                    json!({
                        "total": 4,
                        "offset": 0,
                        "next": "/items?offset=2",
                        "items": [item(0), item(1)],
                    })
                    .to_string(),
                ),
            )
            .respond(
                Method::GET,
                "/items?offset=2",
                RawResponse::from_transport_error(TransportError::new(
                    TransportError::TIMEOUT,
                    "timed out",
                )),
            );

        let (_, page) = client
            .builder()
            .add_path("items")
            .send_paging::<Item, ApiError>()
            .result()
            .await
            .unwrap();

        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        let policy = ErrorPolicy::<ApiError>::all_errors(move |_, code, kind| {
            sink.borrow_mut().push((code, kind))
        });
        let (seen, iterator) = record_indices();
        assert_eq!(page.iterate_with(iterator, policy, -1, 0), 2);

        wait_until(|| !errors.borrow().is_empty()).await;
        assert_eq!(*seen.borrow(), vec![0, 1]);
        assert_eq!(
            *errors.borrow(),
            vec![(TransportError::TIMEOUT, ErrorKind::Network)]
        );
    })
    .await;
}

#[tokio::test]
async fn test_previous_page_navigation() {
    run_local(async {
        let (client, transport) = mock_client();
        transport
            .respond(
                Method::GET,
                "/items",
                RawResponse::json(
                    200,
                    json!({ "offset": 2, "next": null, "previous": "/items?offset=0", "items": [item(2)] })
                        .to_string(),
                ),
            )
            .respond(
                Method::GET,
                "/items?offset=0",
                RawResponse::json(
                    200,
                    json!({ "offset": 0, "next": "/items", "items": [item(0), item(1)] }).to_string(),
                ),
            );

        let (_, page) = client
            .builder()
            .add_path("items")
            .send_paging::<Item, ApiError>()
            .result()
            .await
            .unwrap();
        assert!(page.next::<ApiError>().is_none());

        let (_, previous) = page
            .previous::<ApiError>()
            .unwrap()
            .result()
            .await
            .unwrap();
        assert_eq!(previous.offset(), 0);
        assert_eq!(previous.item_count(), 2);
    })
    .await;
}

#[tokio::test]
async fn test_global_api_registry_sends() {
    run_local(async {
        let transport = Arc::new(MockTransport::new());
        transport.respond(Method::GET, "/v2/ping", RawResponse::json(200, r#""pong""#));
        let client = assert_ok!(crate::RestClient::with_transport(
            ClientConfig {
                api_version: Some("2.0".into()),
                ..ClientConfig::new("http://api.test/")
            },
            transport.clone(),
        ));

        assert_ok!(add_global_api("e2e", client.clone()));
        assert_err!(add_global_api("e2e", client));

        let (_, pong) = api_client("e2e")
            .unwrap()
            .root_class()
            .get::<String, ApiError>("ping")
            .result()
            .await
            .unwrap();
        assert_eq!(pong, "pong");
        assert!(remove_global_api("e2e").is_some());
    })
    .await;
}

#[tokio::test]
async fn test_abort_pending_request() {
    run_local(async {
        let (client, transport) = mock_client();
        transport.respond_after(
            Method::GET,
            "/slow",
            RawResponse::json(200, "{}"),
            std::time::Duration::from_secs(30),
        );

        let reply = client.builder().add_path("slow").send_generic::<Item, ApiError>();
        let result = reply.result();
        reply.abort();

        match result.await {
            Err(AwaitedError::Error { code, kind, .. }) => {
                assert_eq!(code, TransportError::CANCELED);
                assert_eq!(kind, ErrorKind::Network);
            }
            other => panic!("unexpected outcome {:?}", other.map(|(status, _)| status)),
        }
    })
    .await;
}
