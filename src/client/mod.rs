// src/client/mod.rs
//! Client side of the API: authenticated fetch wrapper, Firebase session,
//! observable auth state, route guard and interview session.

pub mod auth_store;
pub mod guard;
pub mod interview;
pub mod session;
#[cfg(test)]
pub(crate) mod test_support;

pub use auth_store::{AuthSnapshot, AuthStore};
pub use guard::{GuardDecision, Navigator, RouteGuard};
pub use interview::InterviewSession;
pub use session::FirebaseSession;

use crate::error::ErrorKind;
use crate::web::types::StandardErrorResponse;
use anyhow::{Context, Result};
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use reqwest::multipart::Form;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ClientError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ClientError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unauthenticated() -> Self {
        Self::new(
            ErrorKind::Unauthenticated,
            "User not authenticated. Please log in.",
        )
    }

    /// The caller should be sent back to the login screen.
    pub fn requires_login(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Unauthenticated | ErrorKind::SessionExpired
        )
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::new(ErrorKind::InternalError, format!("Request failed: {}", e))
    }
}

/// Source of the signed-in user's credential.
#[rocket::async_trait]
pub trait SessionProvider: Send + Sync {
    /// Current ID token, `None` when nobody is signed in. With
    /// `force_refresh` the provider mints a new token instead of reusing one.
    async fn id_token(&self, force_refresh: bool) -> Result<Option<String>, ClientError>;
}

pub type TextChunks = BoxStream<'static, Result<String, ClientError>>;

/// Fetch wrapper that attaches a freshly minted bearer token to every call.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<dyn SessionProvider>,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Arc<dyn SessionProvider>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn bearer(&self) -> Result<String, ClientError> {
        self.session
            .id_token(true)
            .await?
            .ok_or_else(ClientError::unauthenticated)
    }

    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let token = self.bearer().await?;
        debug!("POST {}", path);
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        decode_json(checked(response).await?).await
    }

    pub async fn post_form<R: DeserializeOwned>(&self, path: &str, form: Form) -> Result<R, ClientError> {
        let token = self.bearer().await?;
        debug!("POST {} (multipart)", path);
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;
        decode_json(checked(response).await?).await
    }

    /// POST a JSON body and relay the plain-text response as it arrives.
    pub async fn post_stream<B>(&self, path: &str, body: &B) -> Result<TextChunks, ClientError>
    where
        B: Serialize + ?Sized,
    {
        let token = self.bearer().await?;
        debug!("POST {} (stream)", path);
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        let chunks = checked(response)
            .await?
            .bytes_stream()
            .map_err(ClientError::from)
            .scan(Utf8Chunks::default(), |decoder, chunk| {
                let item = chunk.map(|bytes| decoder.push(&bytes));
                std::future::ready(Some(item))
            })
            .try_filter(|text| std::future::ready(!text.is_empty()))
            .boxed();
        Ok(chunks)
    }

    pub async fn create_profile(&self, name: &str) -> Result<(), ClientError> {
        let _: serde_json::Value = self
            .post_json("/api/profile", &serde_json::json!({ "name": name }))
            .await?;
        Ok(())
    }
}

async fn checked(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let error = match serde_json::from_str::<StandardErrorResponse>(&text) {
        Ok(body) => ClientError::new(ErrorKind::from_code(&body.error_code), body.error),
        Err(_) => ClientError::new(
            fallback_kind(status.as_u16()),
            format!("The API request failed with status {}.", status),
        ),
    };
    warn!("API error {}: {} ({})", status, error.message, error.kind.code());
    Err(error)
}

fn fallback_kind(status: u16) -> ErrorKind {
    match status {
        401 => ErrorKind::Unauthenticated,
        400 | 422 => ErrorKind::BadRequest,
        _ => ErrorKind::InternalError,
    }
}

async fn decode_json<R: DeserializeOwned>(response: Response) -> Result<R, ClientError> {
    response.json::<R>().await.map_err(|e| {
        ClientError::new(
            ErrorKind::InternalError,
            format!("Unexpected response from the API: {}", e),
        )
    })
}

/// Decodes UTF-8 text split at arbitrary byte boundaries.
#[derive(Debug, Default)]
struct Utf8Chunks {
    pending: Vec<u8>,
}

impl Utf8Chunks {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let valid = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            // invalid sequence, not just a truncated one
            Err(_) => {
                let text = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                return text;
            }
        };
        let rest = self.pending.split_off(valid);
        String::from_utf8(std::mem::replace(&mut self.pending, rest)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoSession;

    #[rocket::async_trait]
    impl SessionProvider for NoSession {
        async fn id_token(&self, _force_refresh: bool) -> Result<Option<String>, ClientError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_no_signed_in_user_fails_before_sending() {
        // nothing listens on this port; reaching the network would be a transport error
        let client = ApiClient::new("http://127.0.0.1:9", Arc::new(NoSession)).unwrap();
        let err = client
            .post_json::<_, serde_json::Value>("/api/career-paths", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthenticated);
        assert!(err.requires_login());
    }

    #[tokio::test]
    async fn test_every_call_forces_a_token_refresh() {
        let tokens = Arc::new(test_support::RecordingSession::default());

        let (url, server) = test_support::serve_once("200 OK", "application/json", "{}").await;
        let client = ApiClient::new(&url, tokens.clone()).unwrap();
        let _: serde_json::Value = client
            .post_json("/api/career-paths", &serde_json::json!({}))
            .await
            .unwrap();
        server.await.unwrap();

        let (url, server) = test_support::serve_once("200 OK", "application/json", "{}").await;
        let client = ApiClient::new(&url, tokens.clone()).unwrap();
        let _: serde_json::Value = client
            .post_form("/api/analyze-resume", Form::new().text("jobDescriptionText", "Rust"))
            .await
            .unwrap();
        server.await.unwrap();

        let (url, server) =
            test_support::serve_once("200 OK", "text/plain; charset=utf-8", "Hello").await;
        let client = ApiClient::new(&url, tokens.clone()).unwrap();
        let chunks: Vec<String> = client
            .post_stream("/api/interview/chat", &serde_json::json!({}))
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(chunks.concat(), "Hello");
        server.await.unwrap();

        assert_eq!(tokens.refreshes(), vec![true, true, true]);
    }

    #[tokio::test]
    async fn test_post_form_sends_multipart_upload() {
        let (url, server) = test_support::serve_once(
            "200 OK",
            "application/json",
            r#"{"strengths":["a","b","c"],"gaps":["d","e","f"],"atsScore":64,"suggestions":["g","h"]}"#,
        )
        .await;
        let tokens = Arc::new(test_support::RecordingSession::default());
        let client = ApiClient::new(&url, tokens).unwrap();

        let part = reqwest::multipart::Part::bytes(b"%PDF-1.4 resume".to_vec())
            .file_name("CV (final).pdf")
            .mime_str("application/pdf")
            .unwrap();
        let form = Form::new()
            .part("resumeFile", part)
            .text("jobDescriptionText", "Rust developer");
        let result: crate::types::AnalysisResult =
            client.post_form("/api/analyze-resume", form).await.unwrap();
        assert_eq!(result.ats_score, 64);

        let request = server.await.unwrap();
        let lower = request.to_ascii_lowercase();
        assert!(request.starts_with("POST /api/analyze-resume"));
        assert!(lower.contains("content-type: multipart/form-data; boundary="));
        assert!(lower.contains("authorization: bearer test-token"));
        assert!(request.contains("name=\"resumeFile\"; filename=\"CV (final).pdf\""));
        assert!(request.contains("%PDF-1.4 resume"));
        assert!(request.contains("name=\"jobDescriptionText\"\r\n\r\nRust developer"));
    }

    #[test]
    fn test_requires_login() {
        assert!(ClientError::new(ErrorKind::SessionExpired, "expired").requires_login());
        assert!(!ClientError::new(ErrorKind::InvalidAiOutput, "bad").requires_login());
        assert!(!ClientError::new(ErrorKind::BadRequest, "bad").requires_login());
    }

    #[test]
    fn test_utf8_chunks_rejoin_split_characters() {
        let mut decoder = Utf8Chunks::default();
        let bytes = "₹8,00,000".as_bytes();
        assert_eq!(decoder.push(&bytes[..1]), "");
        assert_eq!(decoder.push(&bytes[1..4]), "₹8");
        assert_eq!(decoder.push(&bytes[4..]), ",00,000");
    }

    #[test]
    fn test_url_joining() {
        let client = ApiClient::new("http://localhost:8000/", Arc::new(NoSession)).unwrap();
        assert_eq!(client.url("/api/roadmap"), "http://localhost:8000/api/roadmap");
        assert_eq!(client.url("api/me"), "http://localhost:8000/api/me");
    }
}
