//! OAuth2 Refresh Token Grant.
//!
//! Providers are not required to rotate refresh tokens. When the response
//! carries no new refresh token, the one that was presented is kept on the
//! returned token so the caller can refresh again.

use tokio_util::sync::CancellationToken;

use crate::auth::oauth::error::codes;
use crate::auth::oauth::manager::{Field, OAuth2Manager};
use crate::auth::oauth::token::OAuth2Token;
use crate::clients::ClientError;

impl OAuth2Manager {
    /// Exchanges a refresh token for a new access token.
    ///
    /// Requires `client_id`, `client_secret`, and `token_url`.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] of kind [`OAuth2`](crate::ErrorKind::OAuth2);
    /// failures other than configuration or provider errors use the code
    /// `token_refresh_failed`. Returns kind
    /// [`Cancelled`](crate::ErrorKind::Cancelled) if `cancel` fires.
    pub async fn refresh_token(
        &self,
        cancel: &CancellationToken,
        refresh_token: &str,
    ) -> Result<OAuth2Token, ClientError> {
        let config = self.require(&[Field::ClientId, Field::ClientSecret, Field::TokenUrl])?;

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", config.client_id()),
            ("client_secret", config.client_secret().as_ref()),
        ];

        let mut token = self
            .request_token(cancel, config.token_url(), &form, codes::TOKEN_REFRESH_FAILED, None)
            .await?;

        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }
        Ok(token)
    }
}
