//! Integration tests for the webhook HTTP ingress.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use firefly_client::webhooks::{
    signature_header, HandlerError, WebhookEvent, WebhookManager, WebhookServer,
    DEFAULT_WEBHOOK_PATH, SIGNATURE_HEADER,
};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

const SECRET: &str = "webhook-secret";
const EVENT: &str =
    r#"{"id":"evt-1","type":"UPDATE_TRANSACTION","timestamp":"2024-03-01T12:00:00Z","data":{}}"#;

fn server_with_counter(fail: bool) -> (WebhookServer, Arc<AtomicUsize>) {
    let manager = Arc::new(WebhookManager::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    manager.register_handler_fn("UPDATE_TRANSACTION", move |_: Arc<WebhookEvent>| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            if fail {
                return Err::<(), HandlerError>("downstream failure".into());
            }
            Ok(())
        }
    });
    (WebhookServer::new(manager).with_secret(SECRET), calls)
}

fn post(body: &str, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(DEFAULT_WEBHOOK_PATH)
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_signed_delivery_is_dispatched() {
    let (server, calls) = server_with_counter(false);
    let signature = signature_header(SECRET, 1_709_294_400, EVENT.as_bytes());

    let response = server
        .router()
        .oneshot(post(EVENT, Some(signature)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_signature_is_unauthorized() {
    let (server, calls) = server_with_counter(false);

    let response = server.router().oneshot(post(EVENT, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_wrong_secret_is_unauthorized() {
    let (server, calls) = server_with_counter(false);
    let signature = signature_header("another-secret", 1, EVENT.as_bytes());

    let response = server
        .router()
        .oneshot(post(EVENT, Some(signature)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_payload_is_bad_request() {
    let (server, calls) = server_with_counter(false);
    let body = "{\"id\":";
    let signature = signature_header(SECRET, 1, body.as_bytes());

    let response = server
        .router()
        .oneshot(post(body, Some(signature)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_handler_failure_is_server_error() {
    let (server, calls) = server_with_counter(true);
    let signature = signature_header(SECRET, 1, EVENT.as_bytes());

    let response = server
        .router()
        .oneshot(post(EVENT, Some(signature)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_get_is_method_not_allowed() {
    let (server, _) = server_with_counter(false);
    let request = Request::builder()
        .method(Method::GET)
        .uri(DEFAULT_WEBHOOK_PATH)
        .body(Body::empty())
        .unwrap();

    let response = server.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unsigned_server_accepts_plain_delivery() {
    let manager = Arc::new(WebhookManager::new());
    let server = WebhookServer::new(manager).with_path("/hooks/firefly");
    let request = Request::builder()
        .method(Method::POST)
        .uri("/hooks/firefly")
        .body(Body::from(EVENT))
        .unwrap();

    let response = server.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_serve_stops_on_cancel() {
    let (server, calls) = server_with_counter(false);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(server.serve(listener, shutdown.clone()));

    let response = reqwest::Client::new()
        .post(format!("http://{addr}{DEFAULT_WEBHOOK_PATH}"))
        .header(SIGNATURE_HEADER, signature_header(SECRET, 5, EVENT.as_bytes()))
        .body(EVENT)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    drop(response);

    shutdown.cancel();
    handle.await.unwrap().unwrap();
}

fn stuck_server() -> (WebhookServer, Arc<tokio::sync::Notify>) {
    let manager = Arc::new(WebhookManager::new());
    let started = Arc::new(tokio::sync::Notify::new());
    let notify = Arc::clone(&started);
    manager.register_handler_fn("UPDATE_TRANSACTION", move |_: Arc<WebhookEvent>| {
        let notify = Arc::clone(&notify);
        async move {
            notify.notify_one();
            std::future::pending::<()>().await;
            Ok::<(), HandlerError>(())
        }
    });
    (WebhookServer::new(manager), started)
}

#[tokio::test(start_paused = true)]
async fn test_stuck_handler_is_answered_with_request_timeout() {
    let (server, _) = stuck_server();

    let response = server
        .with_request_timeout(Duration::from_secs(10))
        .router()
        .oneshot(post(EVENT, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
}

#[tokio::test]
async fn test_shutdown_drain_is_bounded() {
    let (server, started) = stuck_server();
    let server = server
        .with_request_timeout(Duration::from_secs(300))
        .with_shutdown_timeout(Duration::from_millis(200));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(server.serve(listener, shutdown.clone()));

    let delivery = tokio::spawn(async move {
        let _ = reqwest::Client::new()
            .post(format!("http://{addr}{DEFAULT_WEBHOOK_PATH}"))
            .body(EVENT)
            .send()
            .await;
    });
    started.notified().await;

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("serve did not return after the drain limit")
        .unwrap()
        .unwrap();
    delivery.abort();
}
