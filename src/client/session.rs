// src/client/session.rs
//! Firebase Authentication over its REST API (email and password accounts).

use super::auth_store::{AuthService, AuthServiceError};
use super::{ClientError, SessionProvider};
use crate::error::ErrorKind;
use crate::types::User;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Clone)]
struct Tokens {
    id_token: String,
    refresh_token: String,
    expires_at: Instant,
}

impl Tokens {
    fn new(id_token: String, refresh_token: String, expires_in: &str) -> Self {
        let lifetime = expires_in.parse::<u64>().unwrap_or(3600);
        Self {
            id_token,
            refresh_token,
            // refresh a minute early
            expires_at: Instant::now() + Duration::from_secs(lifetime.saturating_sub(60)),
        }
    }
}

/// Map an Identity Toolkit error code such as `EMAIL_EXISTS` or
/// `WEAK_PASSWORD : Password should be at least 6 characters`.
pub fn classify_error(message: &str) -> AuthServiceError {
    let code = message.split(':').next().unwrap_or("").trim();
    match code {
        "EMAIL_EXISTS" => AuthServiceError::EmailAlreadyInUse,
        "INVALID_LOGIN_CREDENTIALS" | "INVALID_PASSWORD" | "EMAIL_NOT_FOUND" | "USER_DISABLED" => {
            AuthServiceError::InvalidCredentials
        }
        _ => AuthServiceError::Other(message.to_string()),
    }
}

pub struct FirebaseSession {
    http: Client,
    api_key: String,
    identity_url: String,
    token_url: String,
    tokens: RwLock<Option<Tokens>>,
    user: watch::Sender<Option<User>>,
}

impl FirebaseSession {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_endpoints(api_key, IDENTITY_TOOLKIT_URL, SECURE_TOKEN_URL)
    }

    pub fn with_endpoints(api_key: String, identity_url: &str, token_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        let (user, _) = watch::channel(None);

        Ok(Self {
            http,
            api_key,
            identity_url: identity_url.trim_end_matches('/').to_string(),
            token_url: token_url.trim_end_matches('/').to_string(),
            tokens: RwLock::new(None),
            user,
        })
    }

    pub fn current_user(&self) -> Option<User> {
        self.user.borrow().clone()
    }

    async fn post<B, R>(&self, url: String, body: &B) -> Result<R, AuthServiceError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| AuthServiceError::Other(e.to_string()))?;
        Self::decode(response).await
    }

    async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, AuthServiceError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AuthServiceError::Other(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| format!("Auth service returned status {}", status));
            debug!("Auth service error {}: {}", status, message);
            return Err(classify_error(&message));
        }

        serde_json::from_str(&text).map_err(|e| AuthServiceError::Other(e.to_string()))
    }

    async fn start_session(&self, account: AccountResponse) {
        let user = User {
            uid: account.local_id,
            email: account.email,
            display_name: account.display_name.filter(|n| !n.is_empty()),
            avatar_url: None,
        };
        *self.tokens.write().await = Some(Tokens::new(
            account.id_token,
            account.refresh_token,
            &account.expires_in,
        ));
        info!("Session started for {}", user.uid);
        self.user.send_replace(Some(user));
    }

    async fn end_session(&self) {
        *self.tokens.write().await = None;
        self.user.send_replace(None);
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .post(format!("{}/token", self.token_url))
            .query(&[("key", self.api_key.as_str())])
            .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .send()
            .await?;

        match Self::decode::<RefreshResponse>(response).await {
            Ok(refreshed) => {
                let tokens = Tokens::new(
                    refreshed.id_token.clone(),
                    refreshed.refresh_token,
                    &refreshed.expires_in,
                );
                *self.tokens.write().await = Some(tokens);
                Ok(refreshed.id_token)
            }
            Err(e) => {
                warn!("Token refresh failed, signing out: {}", e);
                self.end_session().await;
                Err(ClientError::new(
                    ErrorKind::SessionExpired,
                    "Authentication session has expired. Please log in again.",
                ))
            }
        }
    }
}

#[rocket::async_trait]
impl AuthService for FirebaseSession {
    fn session_changes(&self) -> watch::Receiver<Option<User>> {
        self.user.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthServiceError> {
        let account: AccountResponse = self
            .post(
                format!("{}/accounts:signInWithPassword", self.identity_url),
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        self.start_session(account).await;
        Ok(())
    }

    async fn sign_up(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(), AuthServiceError> {
        let mut account: AccountResponse = self
            .post(
                format!("{}/accounts:signUp", self.identity_url),
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;

        let _: serde_json::Value = self
            .post(
                format!("{}/accounts:update", self.identity_url),
                &UpdateProfileRequest {
                    id_token: &account.id_token,
                    display_name: name,
                    return_secure_token: false,
                },
            )
            .await?;

        account.display_name = Some(name.to_string());
        self.start_session(account).await;
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthServiceError> {
        self.end_session().await;
        info!("Signed out");
        Ok(())
    }
}

#[rocket::async_trait]
impl SessionProvider for FirebaseSession {
    async fn id_token(&self, force_refresh: bool) -> Result<Option<String>, ClientError> {
        let tokens = self.tokens.read().await.clone();
        let Some(tokens) = tokens else {
            return Ok(None);
        };

        if !force_refresh && Instant::now() < tokens.expires_at {
            return Ok(Some(tokens.id_token));
        }
        self.refresh(&tokens.refresh_token).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_error() {
        assert_eq!(classify_error("EMAIL_EXISTS"), AuthServiceError::EmailAlreadyInUse);
        assert_eq!(
            classify_error("INVALID_LOGIN_CREDENTIALS"),
            AuthServiceError::InvalidCredentials
        );
        assert_eq!(
            classify_error("WEAK_PASSWORD : Password should be at least 6 characters"),
            AuthServiceError::Other(
                "WEAK_PASSWORD : Password should be at least 6 characters".into()
            )
        );
    }

    #[test]
    fn test_account_response_parsing() {
        let account: AccountResponse = serde_json::from_str(
            r#"{"kind":"identitytoolkit#VerifyPasswordResponse","localId":"abc","email":"asha@example.com","displayName":"","idToken":"id","registered":true,"refreshToken":"rt","expiresIn":"3600"}"#,
        )
        .unwrap();
        assert_eq!(account.local_id, "abc");
        assert_eq!(account.expires_in, "3600");
    }

    #[test]
    fn test_tokens_refresh_early() {
        let tokens = Tokens::new("id".into(), "rt".into(), "3600");
        assert!(tokens.expires_at > Instant::now() + Duration::from_secs(3000));
        assert!(tokens.expires_at < Instant::now() + Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_no_session_has_no_token() {
        let session = FirebaseSession::new("key".into()).unwrap();
        assert_eq!(session.id_token(true).await.unwrap(), None);
        assert!(session.current_user().is_none());
        assert!(session.session_changes().borrow().is_none());
    }
}
