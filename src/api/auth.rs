use super::constants::{self, headers};
use super::models::{Credentials, TokenInfo};
use crate::error::AuthError;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

type AuthResult<T> = std::result::Result<T, AuthError>;

/// Turns credentials into a bearer token and keeps it for the rest of the run
pub struct AuthManager {
    http_client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    token: RwLock<Option<TokenInfo>>,
}

impl AuthManager {
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            credentials,
            token: RwLock::new(None),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// A supplied token cannot be exchanged for a fresh one
    pub fn can_refresh(&self) -> bool {
        !matches!(self.credentials, Credentials::Token(_))
    }

    /// Cached token, or a new one when none is held or the held one is past its expiry
    pub async fn token(&self) -> AuthResult<TokenInfo> {
        if let Some(token) = self.token.read().await.as_ref() {
            if !token.is_expired() {
                return Ok(token.clone());
            }
            log::debug!("Cached token for {} has expired", self.base_url);
        }
        self.refresh().await
    }

    /// Discard any held token and obtain a new one
    pub async fn refresh(&self) -> AuthResult<TokenInfo> {
        let token = self.obtain_token().await?;
        *self.token.write().await = Some(token.clone());
        Ok(token)
    }

    pub async fn invalidate(&self) {
        *self.token.write().await = None;
    }

    /// Exchange the configured credentials for a token
    pub async fn obtain_token(&self) -> AuthResult<TokenInfo> {
        log::info!(
            "Authenticating to {} using {}",
            self.base_url,
            self.credentials.kind()
        );

        match &self.credentials {
            Credentials::ClientCredentials {
                client_id,
                client_secret,
            } => {
                let url = constants::join_url(&self.base_url, constants::OAUTH_TOKEN_ENDPOINT);
                let response = self
                    .http_client
                    .post(&url)
                    .form(&[
                        ("grant_type", "client_credentials"),
                        ("client_id", client_id.as_str()),
                        ("client_secret", client_secret.as_str()),
                    ])
                    .send()
                    .await
                    .map_err(transport_error)?;

                let token_data = Self::read_token_response(response).await?;
                let access_token = token_data
                    .get("access_token")
                    .and_then(|t| t.as_str())
                    .ok_or_else(|| AuthError::MalformedResponse("no access_token in response".into()))?;

                let expires_at = token_data
                    .get("expires_in")
                    .and_then(|e| e.as_i64())
                    .map(|secs| Utc::now() + ChronoDuration::seconds(secs));

                log::info!("Obtained OAuth access token");
                Ok(TokenInfo {
                    access_token: access_token.to_string(),
                    expires_at,
                })
            }
            Credentials::UsernamePassword { username, password } => {
                let url = constants::join_url(&self.base_url, constants::TOKEN_ENDPOINT);
                let response = self
                    .http_client
                    .post(&url)
                    .basic_auth(username, Some(password))
                    .header("Accept", headers::CONTENT_TYPE_JSON)
                    .send()
                    .await
                    .map_err(transport_error)?;

                let token_data = Self::read_token_response(response).await?;
                let access_token = token_data
                    .get("token")
                    .and_then(|t| t.as_str())
                    .ok_or_else(|| AuthError::MalformedResponse("no token in response".into()))?;

                let expires_at = token_data
                    .get("expires")
                    .and_then(|e| e.as_str())
                    .and_then(|e| DateTime::parse_from_rfc3339(e).ok())
                    .map(|dt| dt.with_timezone(&Utc));

                log::info!("Obtained bearer token for {}", username);
                Ok(TokenInfo {
                    access_token: access_token.to_string(),
                    expires_at,
                })
            }
            Credentials::Token(token) => Ok(TokenInfo {
                access_token: token.clone(),
                expires_at: None,
            }),
        }
    }

    async fn read_token_response(response: reqwest::Response) -> AuthResult<Value> {
        let status = response.status();
        log::debug!("Token request status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message: error_text,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))
    }
}

fn transport_error(error: reqwest::Error) -> AuthError {
    AuthError::Rejected {
        status: error.status().map(|s| s.as_u16()).unwrap_or(0),
        message: error.to_string(),
    }
}
