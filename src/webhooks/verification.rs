//! Webhook signature creation and verification.
//!
//! Senders sign each delivery with a shared secret and put the result in the
//! `Signature` header:
//!
//! ```text
//! Signature: t=1709294400,v1=5257a869e7ecebeda32affa62cdca3fa51cad7e77a0e56ff536d0ce8e108d8bd
//! ```
//!
//! `v1` is the lowercase hex HMAC-SHA256 of `"<t>.<body>"`. Comparison is
//! constant time.
//!
//! # Example
//!
//! ```rust
//! use firefly_client::webhooks::{signature_header, verify_signature};
//!
//! let body = br#"{"id":"1"}"#;
//! let header = signature_header("my-secret", 1_709_294_400, body);
//!
//! assert!(verify_signature(&header, body, "my-secret").is_ok());
//! assert!(verify_signature(&header, body, "other-secret").is_err());
//! ```

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::webhooks::errors::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// HTTP header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "Signature";

/// Computes the hex HMAC-SHA256 of `"<timestamp>.<body>"`.
#[must_use]
pub fn sign(secret: &str, timestamp: i64, body: &[u8]) -> String {
    hex::encode(mac(secret, timestamp, body).finalize().into_bytes())
}

/// Builds a complete `Signature` header value.
#[must_use]
pub fn signature_header(secret: &str, timestamp: i64, body: &[u8]) -> String {
    format!("t={timestamp},v1={}", sign(secret, timestamp, body))
}

/// Verifies a `Signature` header value against `body`.
///
/// # Errors
///
/// Returns [`WebhookError::InvalidSignature`] if the header is malformed or
/// the signature does not match.
pub fn verify_signature(header: &str, body: &[u8], secret: &str) -> Result<(), WebhookError> {
    let mut timestamp = None;
    let mut signature = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signature = Some(value),
            _ => {}
        }
    }

    let timestamp: i64 = timestamp
        .and_then(|t| t.parse().ok())
        .ok_or(WebhookError::InvalidSignature {
            reason: "missing or invalid timestamp",
        })?;
    let expected = signature
        .and_then(|s| hex::decode(s).ok())
        .ok_or(WebhookError::InvalidSignature {
            reason: "missing or invalid v1 signature",
        })?;

    let computed = mac(secret, timestamp, body).finalize().into_bytes();
    if bool::from(computed.as_slice().ct_eq(&expected)) {
        Ok(())
    } else {
        Err(WebhookError::InvalidSignature {
            reason: "signature mismatch",
        })
    }
}

fn mac(secret: &str, timestamp: i64, body: &[u8]) -> HmacSha256 {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    mac
}
