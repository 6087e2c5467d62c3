use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use reqwest::StatusCode;
use tokio::sync::Mutex;

use crate::{
    Error, Res,
    spotify::transport::HttpTransport,
    types::{Credentials, TokenResponse},
};

/// Owns the bearer token used for every catalog request.
///
/// The token is requested lazily on the first [`acquire`](Self::acquire) and
/// replaced only when a request reports it expired. There is no expiry timer:
/// Spotify's 401 is the only signal that a refresh is needed.
pub struct TokenManager {
    transport: Arc<dyn HttpTransport>,
    token_url: String,
    credentials: Credentials,
    token: Mutex<Option<String>>,
    refreshes: AtomicU32,
}

impl TokenManager {
    pub fn new(transport: Arc<dyn HttpTransport>, token_url: String, credentials: Credentials) -> Self {
        Self {
            transport,
            token_url,
            credentials,
            token: Mutex::new(None),
            refreshes: AtomicU32::new(0),
        }
    }

    /// Returns the current bearer token, authenticating first if none is held.
    ///
    /// # Errors
    ///
    /// [`Error::AuthFatal`] when the credential exchange does not succeed.
    pub async fn acquire(&self) -> Res<String> {
        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }

        let token = self.request_token().await?;
        *slot = Some(token.clone());
        Ok(token)
    }

    /// Drops the current token and authenticates again before returning.
    ///
    /// Called by the retry driver after a request came back with 401.
    pub async fn invalidate_and_refresh(&self) -> Res<()> {
        let mut slot = self.token.lock().await;
        *slot = None;

        let token = self.request_token().await?;
        *slot = Some(token);
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Number of refreshes triggered by expired tokens so far.
    pub fn refresh_count(&self) -> u32 {
        self.refreshes.load(Ordering::Relaxed)
    }

    async fn request_token(&self) -> Res<String> {
        let client_id = self.credentials.client_id.as_deref().ok_or_else(|| Error::AuthFatal {
            status: None,
            message: "CLIENT_ID is missing. Is your credentials file correct?".to_string(),
        })?;
        let client_secret = self
            .credentials
            .client_secret
            .as_deref()
            .ok_or_else(|| Error::AuthFatal {
                status: None,
                message: "CLIENT_SECRET is missing. Is your credentials file correct?".to_string(),
            })?;

        let response = self
            .transport
            .post_form(
                &self.token_url,
                &[
                    ("grant_type", "client_credentials"),
                    ("client_id", client_id),
                    ("client_secret", client_secret),
                ],
            )
            .await
            .map_err(|e| Error::AuthFatal {
                status: None,
                message: e.to_string(),
            })?;

        if response.status != StatusCode::OK {
            return Err(Error::AuthFatal {
                status: Some(response.status),
                message: format!("{}. Is your credentials file correct?", response.body),
            });
        }

        let token: TokenResponse = serde_json::from_str(&response.body).map_err(|e| Error::AuthFatal {
            status: Some(response.status),
            message: format!("unexpected token response: {}", e),
        })?;

        log::info!(
            "Obtained {} access token (expires in {}s)",
            token.token_type.as_deref().unwrap_or("bearer"),
            token.expires_in.unwrap_or_default()
        );
        Ok(token.access_token)
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("token_url", &self.token_url)
            .field("refreshes", &self.refresh_count())
            .finish_non_exhaustive()
    }
}
