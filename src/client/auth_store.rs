// src/client/auth_store.rs
//! Observable authentication state.
//!
//! The session-change listener started by [`AuthStore::initialize`] is the
//! only writer of `user`. Login, registration and logout only toggle the
//! loading flag and record errors; the user shows up (or disappears) once the
//! auth service reports the new session. After a successful login or
//! registration the loading flag stays set until that report arrives, so a
//! route guard never sees "loaded, no user" in between.

use super::ApiClient;
use crate::types::User;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub const LOGIN_FAILED: &str = "Invalid email or password.";
pub const EMAIL_ALREADY_REGISTERED: &str = "This email is already registered.";
pub const REGISTRATION_FAILED: &str = "An error occurred during registration.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthServiceError {
    #[error("The email address is already in use by another account.")]
    EmailAlreadyInUse,
    #[error("The email or password is incorrect.")]
    InvalidCredentials,
    #[error("{0}")]
    Other(String),
}

/// Managed authentication provider.
#[rocket::async_trait]
pub trait AuthService: Send + Sync {
    /// Signed-in user, updated on every sign-in, sign-up and sign-out.
    fn session_changes(&self) -> watch::Receiver<Option<User>>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthServiceError>;

    /// Create the account and set its display name.
    async fn sign_up(&self, name: &str, email: &str, password: &str)
        -> Result<(), AuthServiceError>;

    async fn sign_out(&self) -> Result<(), AuthServiceError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub user: Option<User>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self {
            user: None,
            is_loading: true,
            error: None,
        }
    }
}

#[derive(Clone)]
pub struct AuthStore {
    service: Arc<dyn AuthService>,
    profiles: Option<ApiClient>,
    state: Arc<watch::Sender<AuthSnapshot>>,
}

impl AuthStore {
    pub fn new(service: Arc<dyn AuthService>) -> Self {
        let (state, _) = watch::channel(AuthSnapshot::default());
        Self {
            service,
            profiles: None,
            state: Arc::new(state),
        }
    }

    /// Create the profile document through the API after registration.
    pub fn with_profiles(mut self, client: ApiClient) -> Self {
        self.profiles = Some(client);
        self
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    /// Start listening for session changes. Aborting the returned handle
    /// unsubscribes.
    pub fn initialize(&self) -> JoinHandle<()> {
        let mut changes = self.service.session_changes();
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            loop {
                let user = changes.borrow_and_update().clone();
                state.send_modify(|snapshot| {
                    snapshot.user = user;
                    snapshot.is_loading = false;
                });
                if changes.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    /// Resolves with the first snapshot satisfying `predicate`.
    pub async fn wait_for<F>(&self, mut predicate: F) -> AuthSnapshot
    where
        F: FnMut(&AuthSnapshot) -> bool,
    {
        let mut rx = self.subscribe();
        loop {
            {
                let snapshot = rx.borrow_and_update();
                if predicate(&snapshot) {
                    return snapshot.clone();
                }
            }
            if rx.changed().await.is_err() {
                return self.snapshot();
            }
        }
    }

    fn begin(&self) {
        self.state.send_modify(|snapshot| {
            snapshot.is_loading = true;
            snapshot.error = None;
        });
    }

    fn fail(&self, message: &str) {
        self.state.send_modify(|snapshot| {
            snapshot.is_loading = false;
            snapshot.error = Some(message.to_string());
        });
    }

    pub async fn login(&self, email: &str, password: &str) -> bool {
        self.begin();
        match self.service.sign_in(email, password).await {
            Ok(()) => {
                info!("Signed in as {}", email);
                true
            }
            Err(e) => {
                warn!("Sign-in failed for {}: {}", email, e);
                self.fail(LOGIN_FAILED);
                false
            }
        }
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> bool {
        self.begin();
        let outcome = match self.service.sign_up(name, email, password).await {
            Ok(()) => match &self.profiles {
                Some(client) => client
                    .create_profile(name)
                    .await
                    .map_err(|e| AuthServiceError::Other(e.to_string())),
                None => Ok(()),
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                info!("Registered {}", email);
                true
            }
            Err(e) => {
                warn!("Registration failed for {}: {}", email, e);
                let message = match e {
                    AuthServiceError::EmailAlreadyInUse => EMAIL_ALREADY_REGISTERED,
                    _ => REGISTRATION_FAILED,
                };
                self.fail(message);
                false
            }
        }
    }

    pub async fn logout(&self) {
        if let Err(e) = self.service.sign_out().await {
            warn!("Sign-out failed: {}", e);
            self.state
                .send_modify(|snapshot| snapshot.error = Some(e.to_string()));
        }
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|snapshot| snapshot.error = None);
    }
}
