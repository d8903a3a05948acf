// src/client/guard.rs
use super::auth_store::AuthSnapshot;
use tokio::sync::watch;
use tracing::info;

pub const LOGIN_ROUTE: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Auth state not known yet; show a placeholder.
    Loading,
    /// No user; the caller was sent to the login route.
    Redirect,
    Render,
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Protects a view that needs a signed-in user.
pub struct RouteGuard<N: Navigator> {
    navigator: N,
    login_route: String,
    redirected: bool,
}

impl<N: Navigator> RouteGuard<N> {
    pub fn new(navigator: N) -> Self {
        Self {
            navigator,
            login_route: LOGIN_ROUTE.to_string(),
            redirected: false,
        }
    }

    pub fn with_login_route(mut self, route: &str) -> Self {
        self.login_route = route.to_string();
        self
    }

    pub fn evaluate(&mut self, snapshot: &AuthSnapshot) -> GuardDecision {
        if snapshot.is_loading {
            return GuardDecision::Loading;
        }
        if snapshot.user.is_some() {
            return GuardDecision::Render;
        }
        if !self.redirected {
            info!("No signed-in user, redirecting to {}", self.login_route);
            self.navigator.navigate(&self.login_route);
            self.redirected = true;
        }
        GuardDecision::Redirect
    }

    /// Follow the auth state until it settles on a decision other than `Loading`.
    pub async fn settle(&mut self, mut states: watch::Receiver<AuthSnapshot>) -> GuardDecision {
        loop {
            let snapshot = states.borrow_and_update().clone();
            let decision = self.evaluate(&snapshot);
            if decision != GuardDecision::Loading || states.changed().await.is_err() {
                return decision;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::User;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingNavigator(Arc<Mutex<Vec<String>>>);

    impl Navigator for RecordingNavigator {
        fn navigate(&self, route: &str) {
            self.0.lock().unwrap().push(route.to_string());
        }
    }

    fn snapshot(is_loading: bool, signed_in: bool) -> AuthSnapshot {
        AuthSnapshot {
            user: signed_in.then(|| User {
                uid: "u1".into(),
                email: Some("asha@example.com".into()),
                display_name: None,
                avatar_url: None,
            }),
            is_loading,
            error: None,
        }
    }

    #[test]
    fn test_never_redirects_while_loading() {
        let navigator = RecordingNavigator::default();
        let mut guard = RouteGuard::new(navigator.clone());

        for _ in 0..3 {
            assert_eq!(guard.evaluate(&snapshot(true, false)), GuardDecision::Loading);
        }
        assert!(navigator.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_redirects_exactly_once() {
        let navigator = RecordingNavigator::default();
        let mut guard = RouteGuard::new(navigator.clone());

        assert_eq!(guard.evaluate(&snapshot(false, false)), GuardDecision::Redirect);
        assert_eq!(guard.evaluate(&snapshot(false, false)), GuardDecision::Redirect);
        assert_eq!(*navigator.0.lock().unwrap(), vec!["/login".to_string()]);
    }

    #[test]
    fn test_renders_for_signed_in_user() {
        let navigator = RecordingNavigator::default();
        let mut guard = RouteGuard::new(navigator.clone()).with_login_route("/signin");
        assert_eq!(guard.evaluate(&snapshot(false, true)), GuardDecision::Render);
        assert!(navigator.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_settle_waits_for_loading_to_finish() {
        let (tx, rx) = watch::channel(snapshot(true, false));
        let navigator = RecordingNavigator::default();
        let mut guard = RouteGuard::new(navigator.clone());

        let task = tokio::spawn(async move { guard.settle(rx).await });
        tx.send_replace(snapshot(false, true));

        assert_eq!(task.await.unwrap(), GuardDecision::Render);
        assert!(navigator.0.lock().unwrap().is_empty());
    }
}
