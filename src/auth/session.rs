//! Session lifecycle for the exchange account.
//!
//! The session is a single state value that every operation replaces
//! atomically. Interested parties subscribe for state-change events; events
//! from one manager arrive in the order the transitions happened.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::auth::CredentialStore;
use crate::models::User;

/// Buffer size for session event channels.
const EVENT_CHANNEL_SIZE: usize = 32;

/// Where the session currently stands. `Loading` covers both the initial
/// status check and any in-flight auth operation.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Loading,
    Authenticated(User),
    Unauthenticated,
    Failed(String),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged(SessionState),
}

pub struct SessionManager {
    api: ApiClient,
    store: Arc<CredentialStore>,
    state: SessionState,
    listeners: Vec<mpsc::Sender<SessionEvent>>,
}

impl SessionManager {
    pub fn new(api: ApiClient, store: Arc<CredentialStore>) -> Self {
        Self {
            api,
            store,
            state: SessionState::Loading,
            listeners: Vec::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        match &self.state {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    /// Reason from the last failed operation, if the session is in that state.
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            SessionState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Subscribe to state changes. Events arrive in transition order; a
    /// subscriber that falls behind delays the sender rather than reordering.
    pub fn subscribe(&mut self) -> mpsc::Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        self.listeners.push(tx);
        rx
    }

    async fn set_state(&mut self, state: SessionState) {
        self.state = state.clone();
        self.listeners.retain(|tx| !tx.is_closed());
        for tx in &self.listeners {
            let _ = tx.send(SessionEvent::StateChanged(state.clone())).await;
        }
    }

    /// Resolve the stored token into a session. With no token stored this
    /// goes straight to `Unauthenticated` without touching the network.
    pub async fn check_status(&mut self) {
        self.set_state(SessionState::Loading).await;

        if self.store.auth_token().is_none() {
            self.set_state(SessionState::Unauthenticated).await;
            return;
        }

        match self.api.fetch_profile().await {
            Ok(profile) => match profile.user {
                Some(user) => {
                    info!(email = %user.email, "Restored session from stored token");
                    self.set_state(SessionState::Authenticated(user)).await;
                }
                None => {
                    // Token no longer maps to an account
                    self.store.clear_auth_token();
                    self.set_state(SessionState::Unauthenticated).await;
                }
            },
            Err(e) => {
                warn!(error = %e, "Auth check failed");
                self.store.clear_auth_token();
                self.set_state(SessionState::Failed(
                    "Authentication check failed".to_string(),
                ))
                .await;
            }
        }
    }

    /// Exchange credentials for a session. The token is persisted only when
    /// the server answers `success: true`; a rejected login leaves whatever
    /// was stored before untouched.
    pub async fn login(&mut self, email: &str, password: &str) -> bool {
        self.set_state(SessionState::Loading).await;

        match self.api.login(email, password).await {
            Ok(envelope) if envelope.success => {
                if let Some(ref token) = envelope.token {
                    self.store.set_auth_token(token);
                }
                match envelope.user {
                    Some(user) => {
                        info!(email = %user.email, "Login succeeded");
                        self.set_state(SessionState::Authenticated(user)).await;
                    }
                    None => self.set_state(SessionState::Unauthenticated).await,
                }
                true
            }
            Ok(envelope) => {
                let reason = envelope
                    .message
                    .unwrap_or_else(|| "Login failed".to_string());
                self.set_state(SessionState::Failed(reason)).await;
                false
            }
            Err(e) => {
                warn!(error = %e, "Login request failed");
                self.set_state(SessionState::Failed(
                    "Login failed. Please check your credentials.".to_string(),
                ))
                .await;
                false
            }
        }
    }

    /// Create an account. Success does not sign the user in and stores no
    /// token; callers follow up with `login`.
    pub async fn register(&mut self, fields: &serde_json::Value) -> bool {
        self.set_state(SessionState::Loading).await;

        match self.api.register(fields).await {
            Ok(envelope) if envelope.success => {
                info!("Registration succeeded");
                self.set_state(SessionState::Unauthenticated).await;
                true
            }
            Ok(envelope) => {
                let reason = envelope
                    .message
                    .unwrap_or_else(|| "Registration failed".to_string());
                self.set_state(SessionState::Failed(reason)).await;
                false
            }
            Err(e) => {
                warn!(error = %e, "Registration request failed");
                self.set_state(SessionState::Failed(
                    "Registration failed. Please try again.".to_string(),
                ))
                .await;
                false
            }
        }
    }

    /// End the session. The local token is cleared no matter what the server
    /// says; a dead network cannot keep the user signed in.
    pub async fn logout(&mut self) {
        self.set_state(SessionState::Loading).await;

        if let Err(e) = self.api.logout().await {
            warn!(error = %e, "Logout request failed, clearing local session anyway");
        }

        self.store.clear_auth_token();
        self.set_state(SessionState::Unauthenticated).await;
    }

    /// PUT an edited profile to the server and adopt the copy it echoes
    /// back. The session only changes while authenticated; a server answer
    /// without a user leaves it as it was.
    pub async fn update_profile(&mut self, fields: &serde_json::Value) -> Result<String, String> {
        match self.api.update_profile(fields).await {
            Ok(profile) => {
                if let Some(user) = profile.user {
                    if self.state.is_authenticated() {
                        info!(email = %user.email, "Profile updated");
                        self.set_state(SessionState::Authenticated(user)).await;
                    }
                }
                Ok("Profile updated".to_string())
            }
            Err(e) => {
                warn!(error = %e, "Profile update failed");
                Err("Could not update profile".to_string())
            }
        }
    }

    /// Ask the server to start a password reset for `email`. Purely
    /// fire-and-forget from the session's point of view; state is untouched.
    pub async fn request_password_reset(&self, email: &str) -> Result<String, String> {
        match self.api.reset_password(email).await {
            Ok(envelope) if envelope.success => Ok(envelope
                .message
                .unwrap_or_else(|| "Password reset email sent".to_string())),
            Ok(envelope) => Err(envelope
                .message
                .unwrap_or_else(|| "Password reset failed".to_string())),
            Err(e) => {
                warn!(error = %e, "Password reset request failed");
                Err("Password reset failed. Please try again.".to_string())
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::auth::store::use_mock_keyring;

    async fn test_session(
        tag: &str,
    ) -> (
        SessionManager,
        Arc<CredentialStore>,
        MockServer,
        tempfile::TempDir,
    ) {
        use_mock_keyring();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let service = format!("coindeck-session-{}-{}", tag, std::process::id());
        let store = Arc::new(CredentialStore::new(&service, dir.path()));
        let server = MockServer::start().await;
        let api = ApiClient::with_base_url(Arc::clone(&store), &server.uri())
            .expect("Failed to build client");
        let session = SessionManager::new(api, Arc::clone(&store));
        (session, store, server, dir)
    }

    fn user_json(email: &str) -> serde_json::Value {
        json!({ "id": "u1", "email": email, "name": "Test User" })
    }

    #[tokio::test]
    async fn test_login_success_persists_token() {
        let (mut session, store, server, _dir) = test_session("login-ok").await;

        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "token": "tok-1",
                "user": user_json("a@b.test"),
            })))
            .expect(1)
            .mount(&server)
            .await;

        assert!(session.login("a@b.test", "hunter2").await);
        assert!(session.is_authenticated());
        assert_eq!(session.user().map(|u| u.email.as_str()), Some("a@b.test"));
        assert_eq!(store.auth_token().as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn test_rejected_login_stores_nothing() {
        let (mut session, store, server, _dir) = test_session("login-rejected").await;

        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "message": "Invalid credentials",
            })))
            .mount(&server)
            .await;

        assert!(!session.login("a@b.test", "wrong").await);
        assert_eq!(session.error(), Some("Invalid credentials"));
        assert_eq!(store.auth_token(), None);
    }

    #[tokio::test]
    async fn test_login_server_error_reads_as_generic_failure() {
        let (mut session, store, server, _dir) = test_session("login-500").await;

        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(!session.login("a@b.test", "pw").await);
        assert_eq!(
            session.error(),
            Some("Login failed. Please check your credentials.")
        );
        assert_eq!(store.auth_token(), None);
    }

    #[tokio::test]
    async fn test_register_success_does_not_sign_in() {
        let (mut session, store, server, _dir) = test_session("register").await;

        Mock::given(method("POST"))
            .and(path("/api/auth/register"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "token": "tok-ignored",
                "message": "Account created",
            })))
            .mount(&server)
            .await;

        let fields = json!({ "email": "new@b.test", "password": "pw", "name": "New" });
        assert!(session.register(&fields).await);
        assert_eq!(*session.state(), SessionState::Unauthenticated);
        assert_eq!(store.auth_token(), None);
    }

    #[tokio::test]
    async fn test_rejected_registration_reports_reason() {
        let (mut session, store, server, _dir) = test_session("register-rejected").await;

        Mock::given(method("POST"))
            .and(path("/api/auth/register"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "message": "Email already registered",
            })))
            .mount(&server)
            .await;

        let fields = json!({ "email": "taken@b.test", "password": "pw" });
        assert!(!session.register(&fields).await);
        assert_eq!(session.error(), Some("Email already registered"));
        assert_eq!(store.auth_token(), None);
    }

    #[tokio::test]
    async fn test_logout_clears_token_even_when_server_errors() {
        let (mut session, store, server, _dir) = test_session("logout").await;

        store.set_auth_token("tok-dead");
        Mock::given(method("POST"))
            .and(path("/api/auth/logout"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        session.logout().await;
        assert_eq!(*session.state(), SessionState::Unauthenticated);
        assert_eq!(store.auth_token(), None);
    }

    #[tokio::test]
    async fn test_check_status_without_token_skips_network() {
        let (mut session, _store, server, _dir) = test_session("status-no-token").await;

        Mock::given(method("GET"))
            .and(path("/api/user"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        session.check_status().await;
        assert_eq!(*session.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_check_status_restores_session() {
        let (mut session, store, server, _dir) = test_session("status-ok").await;

        store.set_auth_token("tok-live");
        Mock::given(method("GET"))
            .and(path("/api/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": user_json("back@b.test"),
            })))
            .expect(1)
            .mount(&server)
            .await;

        session.check_status().await;
        assert!(session.is_authenticated());
        assert_eq!(session.user().map(|u| u.id.as_str()), Some("u1"));
        assert_eq!(store.auth_token().as_deref(), Some("tok-live"));
    }

    #[tokio::test]
    async fn test_check_status_failure_clears_token() {
        let (mut session, store, server, _dir) = test_session("status-fail").await;

        store.set_auth_token("tok-stale");
        Mock::given(method("GET"))
            .and(path("/api/user"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        session.check_status().await;
        assert_eq!(session.error(), Some("Authentication check failed"));
        assert_eq!(store.auth_token(), None);
    }

    #[tokio::test]
    async fn test_check_status_missing_user_signs_out_quietly() {
        let (mut session, store, server, _dir) = test_session("status-no-user").await;

        store.set_auth_token("tok-orphan");
        Mock::given(method("GET"))
            .and(path("/api/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": null })))
            .mount(&server)
            .await;

        session.check_status().await;
        assert_eq!(*session.state(), SessionState::Unauthenticated);
        assert_eq!(session.error(), None);
        assert_eq!(store.auth_token(), None);
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions_in_order() {
        let (mut session, _store, server, _dir) = test_session("events").await;

        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "token": "tok-events",
                "user": user_json("order@b.test"),
            })))
            .mount(&server)
            .await;

        let mut rx = session.subscribe();
        session.login("order@b.test", "pw").await;

        let SessionEvent::StateChanged(first) = rx.recv().await.expect("Missing first event");
        assert_eq!(first, SessionState::Loading);
        let SessionEvent::StateChanged(second) = rx.recv().await.expect("Missing second event");
        assert!(second.is_authenticated());
    }

    #[tokio::test]
    async fn test_profile_update_replaces_session_user() {
        let (mut session, store, server, _dir) = test_session("profile-edit").await;

        store.set_auth_token("tok-edit");
        Mock::given(method("GET"))
            .and(path("/api/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": user_json("edit@b.test"),
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": { "id": "u1", "email": "edit@b.test", "name": "Renamed" },
            })))
            .expect(1)
            .mount(&server)
            .await;

        session.check_status().await;
        let result = session.update_profile(&json!({ "name": "Renamed" })).await;
        assert_eq!(result, Ok("Profile updated".to_string()));
        assert_eq!(session.user().map(|u| u.name.as_str()), Some("Renamed"));
    }

    #[tokio::test]
    async fn test_password_reset_passes_server_message_through() {
        let (session, _store, server, _dir) = test_session("reset").await;

        Mock::given(method("POST"))
            .and(path("/api/auth/reset-password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "Reset email sent to a@b.test",
            })))
            .mount(&server)
            .await;

        let result = session.request_password_reset("a@b.test").await;
        assert_eq!(result, Ok("Reset email sent to a@b.test".to_string()));
    }
}
