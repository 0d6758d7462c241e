//! Integration tests for middleware ordering and short-circuiting.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use firefly_client::{
    ClientError, ErrorKind, HttpMethod, HttpRequest, HttpResponse, Middleware, MiddlewareChain,
    RetryConfig, RetryMiddleware,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

type Journal = Arc<Mutex<Vec<String>>>;

struct Recorder {
    name: &'static str,
    journal: Journal,
    fail_request: bool,
}

impl Recorder {
    fn new(name: &'static str, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            name,
            journal: Arc::clone(journal),
            fail_request: false,
        })
    }

    fn failing(name: &'static str, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            name,
            journal: Arc::clone(journal),
            fail_request: true,
        })
    }
}

#[async_trait]
impl Middleware for Recorder {
    async fn process_request(
        &self,
        _cancel: &CancellationToken,
        request: HttpRequest,
    ) -> Result<HttpRequest, ClientError> {
        self.journal.lock().unwrap().push(format!("request:{}", self.name));
        if self.fail_request {
            return Err(ClientError::new(ErrorKind::Validation, "rejected"));
        }
        Ok(request)
    }

    async fn process_response(
        &self,
        _cancel: &CancellationToken,
        response: HttpResponse,
    ) -> Result<HttpResponse, ClientError> {
        self.journal.lock().unwrap().push(format!("response:{}", self.name));
        Ok(response)
    }
}

fn request() -> HttpRequest {
    HttpRequest::builder(HttpMethod::Get, "api/v1/accounts")
        .build()
        .unwrap()
}

fn response(code: u16) -> HttpResponse {
    HttpResponse::new(
        HttpMethod::Get,
        "https://ff.example.com/api/v1/accounts",
        code,
        HashMap::new(),
        json!({}),
    )
}

#[tokio::test]
async fn test_request_forward_response_reverse() {
    let journal = Journal::default();
    let chain = MiddlewareChain::new();
    chain.add(Recorder::new("A", &journal));
    chain.add(Recorder::new("B", &journal));

    let cancel = CancellationToken::new();
    let snapshot = chain.snapshot();
    snapshot.process_request(&cancel, request()).await.unwrap();
    snapshot.process_response(&cancel, response(200)).await.unwrap();

    assert_eq!(
        *journal.lock().unwrap(),
        vec!["request:A", "request:B", "response:B", "response:A"]
    );
}

#[tokio::test]
async fn test_error_stops_remaining_middleware() {
    let journal = Journal::default();
    let chain = MiddlewareChain::new();
    chain.add(Recorder::failing("A", &journal));
    chain.add(Recorder::new("B", &journal));

    let error = chain
        .process_request(&CancellationToken::new(), request())
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Validation);
    assert_eq!(*journal.lock().unwrap(), vec!["request:A"]);
}

#[tokio::test]
async fn test_snapshot_ignores_later_additions() {
    let journal = Journal::default();
    let chain = MiddlewareChain::new();
    chain.add(Recorder::new("A", &journal));

    let snapshot = chain.snapshot();
    chain.add(Recorder::new("B", &journal));
    snapshot
        .process_request(&CancellationToken::new(), request())
        .await
        .unwrap();

    assert_eq!(*journal.lock().unwrap(), vec!["request:A"]);
    assert_eq!(chain.len(), 2);
}

#[tokio::test]
async fn test_retry_middleware_signals_only_retryable_statuses() {
    let middleware = RetryMiddleware::new(RetryConfig::default());
    let cancel = CancellationToken::new();

    let error = middleware
        .process_response(&cancel, response(429))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::RateLimit);
    assert_eq!(error.status(), Some(429));

    let error = middleware
        .process_response(&cancel, response(502))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Server);

    let passed = middleware
        .process_response(&cancel, response(404))
        .await
        .unwrap();
    assert_eq!(passed.code, 404);
}

#[tokio::test]
async fn test_concurrent_add_during_processing() {
    let journal = Journal::default();
    let chain = Arc::new(MiddlewareChain::new());
    chain.add(Recorder::new("base", &journal));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let chain = Arc::clone(&chain);
        let journal = Arc::clone(&journal);
        tasks.push(tokio::spawn(async move {
            chain.add(Recorder::new("extra", &journal));
            chain
                .process_request(&CancellationToken::new(), request())
                .await
                .map(|_| ())
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(chain.len(), 9);
}
