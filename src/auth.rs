use crate::config::Config;
use crate::error::AuthError;
use base64::Engine;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Tokens are treated as expired this long before Spotify says they are
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Source of bearer credentials for catalog requests
pub trait CredentialProvider {
    /// Return a valid bearer token, refreshing it if needed
    fn bearer_token(&self) -> Result<String, AuthError>;

    /// Drop any cached token after the catalog rejected it
    fn invalidate(&self) {}
}

/// A fixed token, e.g. one pasted from the developer console
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl CredentialProvider for StaticToken {
    fn bearer_token(&self) -> Result<String, AuthError> {
        if self.token.is_empty() {
            return Err(AuthError::NoSession("empty access token".to_string()));
        }
        Ok(self.token.clone())
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
    refresh_token: Option<String>,
}

/// Token cache that refreshes through the accounts service.
///
/// Uses the refresh-token grant when a refresh token is known, otherwise
/// the client-credentials grant. The whole check-and-refresh runs under one
/// lock so concurrent callers sharing a provider refresh at most once.
pub struct RefreshingCredentials {
    agent: ureq::Agent,
    token_url: String,
    client_id: String,
    client_secret: Option<String>,
    state: Mutex<CredentialState>,
}

#[derive(Debug, Default)]
struct CredentialState {
    cached: Option<CachedToken>,
    refresh_token: Option<String>,
}

impl RefreshingCredentials {
    pub fn new(
        agent: ureq::Agent,
        token_url: String,
        client_id: String,
        client_secret: Option<String>,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            agent,
            token_url,
            client_id,
            client_secret,
            state: Mutex::new(CredentialState {
                cached: None,
                refresh_token,
            }),
        }
    }

    /// Seed the cache with a token obtained elsewhere
    pub fn with_access_token(self, access_token: String, valid_for: Duration) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.cached = Some(CachedToken {
                access_token,
                expires_at: Instant::now() + valid_for,
            });
        }
        self
    }

    fn request_token(&self, refresh_token: Option<&str>) -> Result<TokenResponse, AuthError> {
        let mut form: Vec<(&str, &str)> = Vec::new();
        match refresh_token {
            Some(token) => {
                form.push(("grant_type", "refresh_token"));
                form.push(("refresh_token", token));
            }
            None => {
                if self.client_secret.is_none() {
                    return Err(AuthError::NoSession(
                        "no refresh token and no client secret configured".to_string(),
                    ));
                }
                form.push(("grant_type", "client_credentials"));
            }
        }

        let mut request = self.agent.post(&self.token_url);
        match &self.client_secret {
            Some(secret) => {
                let basic = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", self.client_id, secret));
                request = request.set("Authorization", &format!("Basic {basic}"));
            }
            // PKCE-issued refresh tokens are redeemed with the client id alone
            None => form.push(("client_id", self.client_id.as_str())),
        }

        let response = request.send_form(&form).map_err(|e| match e {
            ureq::Error::Status(code, response) => {
                let body = response.into_string().unwrap_or_default();
                AuthError::RefreshFailed(format!("HTTP {code}: {body}"))
            }
            other => AuthError::RefreshFailed(other.to_string()),
        })?;

        response
            .into_json::<TokenResponse>()
            .map_err(|e| AuthError::RefreshFailed(format!("invalid token response: {e}")))
    }
}

impl CredentialProvider for RefreshingCredentials {
    fn bearer_token(&self) -> Result<String, AuthError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| AuthError::RefreshFailed("credential cache poisoned".to_string()))?;

        if let Some(cached) = &state.cached {
            if cached.expires_at > Instant::now() {
                return Ok(cached.access_token.clone());
            }
        }

        log::info!("Refreshing catalog access token");
        let response = self.request_token(state.refresh_token.as_deref())?;
        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(EXPIRY_MARGIN);

        // Spotify may rotate the refresh token
        if let Some(rotated) = response.refresh_token {
            state.refresh_token = Some(rotated);
        }
        state.cached = Some(CachedToken {
            access_token: response.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(response.access_token)
    }

    fn invalidate(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.cached = None;
        }
    }
}

/// Pick a credential provider from configuration
pub fn provider_from_config(
    config: &Config,
    agent: ureq::Agent,
) -> Result<Box<dyn CredentialProvider>, AuthError> {
    match (&config.client_id, &config.access_token) {
        (Some(client_id), access_token) => {
            let provider = RefreshingCredentials::new(
                agent,
                config.token_url.clone(),
                client_id.clone(),
                config.client_secret.clone(),
                config.refresh_token.clone(),
            );
            let provider: Box<dyn CredentialProvider> = match access_token {
                // Unknown remaining lifetime; a 401 will invalidate it
                Some(token) => Box::new(
                    provider.with_access_token(token.clone(), Duration::from_secs(3600)),
                ),
                None => Box::new(provider),
            };
            Ok(provider)
        }
        (None, Some(token)) => Ok(Box::new(StaticToken::new(token.clone()))),
        (None, None) => Err(AuthError::NoSession(
            "set SPOTIFY_ACCESS_TOKEN or SPOTIFY_CLIENT_ID with a secret or refresh token".to_string(),
        )),
    }
}
