//! Webhook event dispatch for Firefly III.
//!
//! # Overview
//!
//! - [`WebhookManager`]: registry of handlers per event type and the
//!   concurrent dispatcher
//! - [`WebhookHandler`]: trait implemented by handlers; closures are adapted
//!   through [`WebhookManager::register_handler_fn`]
//! - [`WebhookEvent`]: the parsed delivery
//! - [`WebhookServer`]: axum ingress with optional signature verification
//! - [`verify_signature`] and [`signature_header`]: the `Signature` header
//!   scheme
//! - [`WebhookError`]: parse, signature, and aggregated handler failures
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use firefly_client::webhooks::{HandlerError, WebhookError, WebhookEvent, WebhookManager};
//!
//! # tokio_test::block_on(async {
//! let manager = WebhookManager::new();
//! manager.register_handler_fn("STORE_TRANSACTION", |_event: Arc<WebhookEvent>| async {
//!     Ok::<(), HandlerError>(())
//! });
//! manager.register_handler_fn("STORE_TRANSACTION", |_event: Arc<WebhookEvent>| async {
//!     Err::<(), HandlerError>("ledger unavailable".into())
//! });
//!
//! let payload = br#"{"id":"7","type":"STORE_TRANSACTION","timestamp":"2024-03-01T12:00:00Z","data":{}}"#;
//! match manager.process_webhook(payload).await {
//!     Err(WebhookError::HandlerFailures { failures, .. }) => {
//!         assert_eq!(failures.len(), 1);
//!         assert_eq!(failures[0].index, 1);
//!     }
//!     other => panic!("unexpected result: {other:?}"),
//! }
//! # });
//! ```
//!
//! # Thread Safety
//!
//! All types in this module are `Send + Sync`. Handlers may be registered
//! while events are being dispatched.

mod errors;
mod manager;
mod server;
mod types;
mod verification;

pub use errors::{HandlerFailure, WebhookError};
pub use manager::WebhookManager;
pub use server::{
    WebhookServer, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SHUTDOWN_TIMEOUT, DEFAULT_WEBHOOK_PATH,
};
pub use types::{BoxFuture, HandlerError, HandlerFn, WebhookEvent, WebhookHandler};
pub use verification::{sign, signature_header, verify_signature, SIGNATURE_HEADER};
