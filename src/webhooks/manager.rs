//! Concurrent dispatch of webhook events to registered handlers.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use crate::guarded::GuardedMap;
use crate::webhooks::errors::{HandlerFailure, WebhookError};
use crate::webhooks::types::{HandlerError, HandlerFn, WebhookEvent, WebhookHandler};

/// Routes webhook events to the handlers registered for their type.
///
/// Registration is append-only and may happen while events are being
/// processed; an event is dispatched to the handlers registered when its
/// processing started.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use firefly_client::webhooks::{HandlerError, WebhookEvent, WebhookManager};
///
/// # tokio_test::block_on(async {
/// let manager = WebhookManager::new();
/// manager.register_handler_fn("STORE_TRANSACTION", |event: Arc<WebhookEvent>| async move {
///     println!("new transaction {}", event.id);
///     Ok::<(), HandlerError>(())
/// });
///
/// let payload = br#"{"id":"1","type":"STORE_TRANSACTION","timestamp":"2024-03-01T12:00:00Z","data":{}}"#;
/// manager.process_webhook(payload).await.unwrap();
/// # });
/// ```
pub struct WebhookManager {
    handlers: GuardedMap<String, Arc<dyn WebhookHandler>>,
    handler_timeout: Option<Duration>,
}

// Verify WebhookManager is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<WebhookManager>();
};

impl Default for WebhookManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WebhookManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookManager")
            .field("handler_timeout", &self.handler_timeout)
            .finish_non_exhaustive()
    }
}

impl WebhookManager {
    /// Creates a manager with no handlers and no handler timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: GuardedMap::new(),
            handler_timeout: None,
        }
    }

    /// Limits how long each handler may run.
    ///
    /// A handler that exceeds the limit is cancelled and reported as failed.
    #[must_use]
    pub const fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = Some(timeout);
        self
    }

    /// Returns the per-handler timeout, if one is set.
    #[must_use]
    pub const fn handler_timeout(&self) -> Option<Duration> {
        self.handler_timeout
    }

    /// Registers a handler for `event_type`.
    pub fn register_handler(&self, event_type: impl Into<String>, handler: Arc<dyn WebhookHandler>) {
        self.handlers.push(event_type.into(), handler);
    }

    /// Registers an async closure as a handler for `event_type`.
    pub fn register_handler_fn<F, Fut>(&self, event_type: impl Into<String>, f: F)
    where
        F: Fn(Arc<WebhookEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.register_handler(event_type, Arc::new(HandlerFn::new(f)));
    }

    /// Returns how many handlers are registered for `event_type`.
    #[must_use]
    pub fn handler_count(&self, event_type: &str) -> usize {
        self.handlers.snapshot(event_type).len()
    }

    /// Parses `payload` and runs every handler registered for its type.
    ///
    /// Handlers run concurrently, one task each, and all of them are awaited
    /// before this returns. An event type without handlers is not an error.
    ///
    /// # Errors
    ///
    /// - [`WebhookError::PayloadParse`] if `payload` is not a valid event; no
    ///   handler is invoked.
    /// - [`WebhookError::HandlerFailures`] listing every handler that
    ///   returned an error, panicked, or timed out.
    pub async fn process_webhook(&self, payload: &[u8]) -> Result<(), WebhookError> {
        let event: WebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Rejected malformed webhook payload");
            WebhookError::PayloadParse(e)
        })?;
        self.dispatch(event).await
    }

    /// Runs every handler registered for `event.event_type`.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::HandlerFailures`] if any handler fails.
    pub async fn dispatch(&self, event: WebhookEvent) -> Result<(), WebhookError> {
        let handlers = self.handlers.snapshot(event.event_type.as_str());
        if handlers.is_empty() {
            tracing::debug!(event_type = %event.event_type, "No webhook handlers registered");
            return Ok(());
        }

        let event = Arc::new(event);
        let mut tasks = JoinSet::new();
        let mut indices = HashMap::with_capacity(handlers.len());

        for (index, handler) in handlers.iter().enumerate() {
            let handler = Arc::clone(handler);
            let event = Arc::clone(&event);
            let timeout = self.handler_timeout;

            let abort = tasks.spawn(async move {
                let outcome = match timeout {
                    Some(limit) => tokio::time::timeout(limit, handler.handle_event(event))
                        .await
                        .unwrap_or_else(|_| Err(format!("timed out after {limit:?}").into())),
                    None => handler.handle_event(event).await,
                };
                outcome.map_err(|e| e.to_string())
            });
            indices.insert(abort.id(), index);
        }

        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            let (index, message) = match joined {
                Ok((_, Ok(()))) => continue,
                Ok((id, Err(message))) => (indices.get(&id).copied(), message),
                Err(e) => {
                    let index = indices.get(&e.id()).copied();
                    let message = if e.is_panic() {
                        let payload = e.into_panic();
                        format!("panicked: {}", panic_message(&*payload))
                    } else {
                        "cancelled".to_string()
                    };
                    (index, message)
                }
            };
            let index = index.unwrap_or(usize::MAX);
            tracing::error!(
                event_type = %event.event_type,
                event_id = %event.id,
                handler = index,
                "Webhook handler failed: {message}"
            );
            failures.push(HandlerFailure { index, message });
        }

        if failures.is_empty() {
            return Ok(());
        }
        failures.sort_by_key(|failure| failure.index);
        Err(WebhookError::HandlerFailures {
            event_type: event.event_type.clone(),
            failures,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
