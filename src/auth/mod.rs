//! Authentication for the Firefly III client.
//!
//! Requests are authorized with a bearer token. The token is either a
//! personal access token set on [`ClientConfig`](crate::ClientConfig) or an
//! [`OAuth2Token`] obtained through one of the grant flows in [`oauth`] and
//! installed with [`HttpClient::set_access_token`](crate::HttpClient::set_access_token).

pub mod oauth;

pub use oauth::{AuthorizationRequest, OAuth2Error, OAuth2Manager, OAuth2Token};
