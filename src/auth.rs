// src/auth.rs
use crate::error::{ApiError, ErrorKind};
use crate::web::types::AppState;
use anyhow::{Context, Result};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::{Request, State};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirebaseUser {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub email_verified: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub aud: String, // Firebase project ID
    pub iss: String, // Firebase issuer
    pub sub: String, // User ID (uid)
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    pub exp: usize,
    pub iat: usize,
}

impl From<Claims> for FirebaseUser {
    fn from(claims: Claims) -> Self {
        Self {
            uid: claims.sub,
            email: claims.email,
            name: claims.name,
            picture: claims.picture,
            email_verified: claims.email_verified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidFormat,
    /// The auth service rejected the credential (expired, bad signature, wrong audience).
    Rejected(String),
    KeysUnavailable(String),
}

impl AuthError {
    pub fn message(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "Authorization token required",
            AuthError::InvalidFormat => "Invalid authorization token format",
            AuthError::Rejected(_) => "Token verification failed",
            AuthError::KeysUnavailable(_) => "Token signing keys unavailable",
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingToken | AuthError::InvalidFormat => ApiError::Unauthenticated,
            AuthError::Rejected(_) => ApiError::SessionExpired,
            AuthError::KeysUnavailable(reason) => {
                ApiError::Internal(anyhow::anyhow!("Token signing keys unavailable: {}", reason))
            }
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingToken)?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidFormat)?
        .trim();
    if token.is_empty() {
        return Err(AuthError::InvalidFormat);
    }
    Ok(token)
}

#[rocket::async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<FirebaseUser, AuthError>;
}

/// Verifies Firebase ID tokens against Google's published signing keys.
pub struct FirebaseTokenVerifier {
    project_id: String,
    client: Client,
    keys: RwLock<JwkSet>,
}

impl FirebaseTokenVerifier {
    pub fn new(project_id: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            project_id,
            client,
            keys: RwLock::new(JwkSet { keys: Vec::new() }),
        })
    }

    /// Fetch Firebase public keys for JWT verification
    pub async fn update_firebase_keys(&self) -> Result<()> {
        let keys: JwkSet = self
            .client
            .get(FIREBASE_JWKS_URL)
            .send()
            .await
            .context("Failed to fetch Firebase signing keys")?
            .error_for_status()?
            .json()
            .await
            .context("Failed to parse Firebase signing keys")?;

        info!("Updated Firebase public keys ({} keys)", keys.keys.len());
        *self.keys.write().await = keys;
        Ok(())
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!(
            "https://securetoken.google.com/{}",
            self.project_id
        )]);
        validation
    }

    async fn decoding_key(&self, kid: &str) -> Option<DecodingKey> {
        let keys = self.keys.read().await;
        keys.find(kid).and_then(|jwk| DecodingKey::from_jwk(jwk).ok())
    }
}

#[rocket::async_trait]
impl TokenVerifier for FirebaseTokenVerifier {
    async fn verify(&self, token: &str) -> Result<FirebaseUser, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::Rejected(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::Rejected("Missing kid in token header".to_string()))?;

        let key = match self.decoding_key(&kid).await {
            Some(key) => key,
            None => {
                // keys rotate; refresh once before giving up
                self.update_firebase_keys()
                    .await
                    .map_err(|e| AuthError::KeysUnavailable(e.to_string()))?;
                self.decoding_key(&kid)
                    .await
                    .ok_or_else(|| AuthError::Rejected(format!("Unknown key ID: {}", kid)))?
            }
        };

        let token_data = decode::<Claims>(token, &key, &self.validation())
            .map_err(|e| AuthError::Rejected(e.to_string()))?;

        Ok(token_data.claims.into())
    }
}

/// Auth failure of the current request, read back by the 401 catcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthFailure(pub Option<ErrorKind>);

/// Request guard: a caller whose bearer credential verified.
pub struct AuthenticatedUser {
    pub firebase_user: FirebaseUser,
}

impl AuthenticatedUser {
    pub fn user(&self) -> &FirebaseUser {
        &self.firebase_user
    }

    pub fn uid(&self) -> &str {
        &self.firebase_user.uid
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let state = match req.guard::<&State<AppState>>().await {
            Outcome::Success(state) => state,
            Outcome::Error((status, _)) => {
                return Outcome::Error((
                    status,
                    AuthError::KeysUnavailable("server state missing".to_string()),
                ))
            }
            Outcome::Forward(f) => return Outcome::Forward(f),
        };

        let token = match bearer_token(req.headers().get_one("Authorization")) {
            Ok(token) => token,
            Err(e) => {
                warn!("Rejected request to {}: {}", req.uri(), e.message());
                req.local_cache(|| AuthFailure(Some(ApiError::from(e.clone()).kind())));
                return Outcome::Error((Status::Unauthorized, e));
            }
        };

        match state.verifier.verify(token).await {
            Ok(firebase_user) => {
                info!("User {} authenticated", firebase_user.uid);
                Outcome::Success(AuthenticatedUser { firebase_user })
            }
            Err(e) => {
                warn!("Token verification failed: {:?}", e);
                let kind = ApiError::from(e.clone()).kind();
                req.local_cache(|| AuthFailure(Some(kind)));
                Outcome::Error((kind.status(), e))
            }
        }
    }
}

// Optional auth guard that doesn't fail if no auth is provided
pub struct OptionalAuth {
    pub user: Option<AuthenticatedUser>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for OptionalAuth {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        if req.headers().get_one("Authorization").is_none() {
            return Outcome::Success(OptionalAuth { user: None });
        }
        match AuthenticatedUser::from_request(req).await {
            Outcome::Success(auth) => Outcome::Success(OptionalAuth { user: Some(auth) }),
            _ => Outcome::Success(OptionalAuth { user: None }),
        }
    }
}
