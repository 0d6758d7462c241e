//! OAuth2 grant flows for Firefly III.
//!
//! [`OAuth2Manager`] implements three grant flows against the endpoints of an
//! [`OAuth2Config`](crate::OAuth2Config):
//!
//! - **Client Credentials**: [`OAuth2Manager::client_credentials_token`]
//! - **Authorization Code**: [`OAuth2Manager::authorization_url`] followed by
//!   [`OAuth2Manager::exchange_code`]
//! - **Refresh Token**: [`OAuth2Manager::refresh_token`]
//!
//! Every flow returns an [`OAuth2Token`] or a
//! [`ClientError`](crate::ClientError) of kind
//! [`OAuth2`](crate::ErrorKind::OAuth2) whose source is an [`OAuth2Error`].
//! Network exchanges take a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! and are otherwise bounded by the client's request timeout.
//!
//! # Example: Authorization Code Flow
//!
//! ```rust,ignore
//! use firefly_client::{HttpClient, ClientConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let client = HttpClient::new(config)?;
//! let cancel = CancellationToken::new();
//!
//! // Step 1: send the user to the authorization URL and keep the state.
//! let request = client.oauth2().authorization_url(None)?;
//! // session.set("oauth_state", &request.state);
//! // return Redirect::to(&request.url);
//!
//! // Step 2: in the callback, compare the returned state, then exchange the code.
//! let token = client.oauth2().exchange_code(&cancel, &code, Some(&request.state)).await?;
//! client.set_access_token(&token);
//!
//! // Later, when the token has expired:
//! if token.is_expired() {
//!     if let Some(refresh) = &token.refresh_token {
//!         let token = client.oauth2().refresh_token(&cancel, refresh).await?;
//!         client.set_access_token(&token);
//!     }
//! }
//! ```

mod authorization_code;
mod client_credentials;
mod error;
mod manager;
mod token;
mod token_refresh;

pub use authorization_code::{generate_state, AuthorizationRequest, STATE_BYTES};
pub use error::{codes, OAuth2Error};
pub use manager::OAuth2Manager;
pub use token::OAuth2Token;
