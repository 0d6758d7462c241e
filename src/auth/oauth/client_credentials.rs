//! OAuth2 Client Credentials Grant.
//!
//! Server-to-server authentication without user interaction. The client ID
//! and secret are posted to the token endpoint together with the configured
//! scopes.

use tokio_util::sync::CancellationToken;

use crate::auth::oauth::error::codes;
use crate::auth::oauth::manager::{Field, OAuth2Manager};
use crate::auth::oauth::token::OAuth2Token;
use crate::clients::ClientError;

/// Grant type for client credentials.
const CLIENT_CREDENTIALS_GRANT_TYPE: &str = "client_credentials";

impl OAuth2Manager {
    /// Obtains an access token with the client-credentials grant.
    ///
    /// Requires `client_id`, `client_secret`, and `token_url`.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] of kind
    /// [`OAuth2`](crate::ErrorKind::OAuth2) wrapping an
    /// [`OAuth2Error`](super::OAuth2Error):
    /// - `oauth2_not_configured` if no configuration is attached
    /// - `oauth2_configuration_incomplete` if a required field is empty
    /// - the provider's own code if the endpoint rejects the request
    /// - `token_request_failed` for any other failure
    ///
    /// Returns kind [`Cancelled`](crate::ErrorKind::Cancelled) if `cancel`
    /// fires during the request.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let token = client.oauth2().client_credentials_token(&cancel).await?;
    /// client.set_access_token(&token);
    /// ```
    pub async fn client_credentials_token(
        &self,
        cancel: &CancellationToken,
    ) -> Result<OAuth2Token, ClientError> {
        let config = self.require(&[Field::ClientId, Field::ClientSecret, Field::TokenUrl])?;

        let scope = config.scopes().join(" ");
        let mut form = vec![
            ("grant_type", CLIENT_CREDENTIALS_GRANT_TYPE),
            ("client_id", config.client_id()),
            ("client_secret", config.client_secret().as_ref()),
        ];
        if !scope.is_empty() {
            form.push(("scope", scope.as_str()));
        }

        self.request_token(cancel, config.token_url(), &form, codes::TOKEN_REQUEST_FAILED, None)
            .await
    }
}
