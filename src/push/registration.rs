//! Server-side device registration for push delivery.
//!
//! The registrar mirrors two records from the credential store: the push
//! token (secure) and the server-assigned device id (plain). A fresh token
//! is persisted first, then sent to the server as a new registration when no
//! device id is cached, or as an update to the existing one when it is.
//! Server failures are logged and absorbed; the next token delivery tries
//! again naturally.

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::ApiClient;
use crate::auth::CredentialStore;
use crate::models::DeviceRegistration;

pub struct DeviceRegistrar {
    api: ApiClient,
    store: Arc<CredentialStore>,
    device_token: Option<String>,
    device_id: Option<String>,
}

impl DeviceRegistrar {
    /// Build a registrar, seeding the token and device id from whatever the
    /// store already holds.
    pub fn new(api: ApiClient, store: Arc<CredentialStore>) -> Self {
        let device_token = store.device_token();
        let device_id = store.device_id();
        Self {
            api,
            store,
            device_token,
            device_id,
        }
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn has_token(&self) -> bool {
        self.device_token.is_some()
    }

    /// Entry point for a token handed over by the push transport. Persists
    /// it, then registers or updates depending on whether a device id is
    /// already cached.
    pub async fn handle_token(&mut self, token: &str) {
        self.device_token = Some(token.to_string());
        self.store.set_device_token(token);

        if self.device_id.is_some() {
            self.update_token().await;
        } else {
            self.register().await;
        }
    }

    /// POST the current token as a new device registration. On success the
    /// server-assigned id is cached in memory and in the plain store.
    pub async fn register(&mut self) {
        let token = match self.device_token.clone() {
            Some(token) => token,
            None => {
                warn!("No device token available for registration");
                return;
            }
        };

        let registration = DeviceRegistration::for_this_host(token);
        match self.api.register_device(&registration).await {
            Ok(response) => {
                if let Some(id) = response.device_id {
                    info!(device_id = %id, "Device registered");
                    self.store.set_device_id(&id);
                    self.device_id = Some(id);
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register device");
            }
        }
    }

    /// PUT the current token onto the existing registration.
    pub async fn update_token(&self) {
        let (id, token) = match (self.device_id.as_deref(), self.device_token.as_deref()) {
            (Some(id), Some(token)) => (id, token),
            _ => {
                warn!("Device id or token missing, cannot update");
                return;
            }
        };

        match self.api.update_device_token(id, token).await {
            Ok(()) => info!("Device token updated"),
            Err(e) => {
                warn!(error = %e, "Failed to update device token");
            }
        }
    }

    /// Flip push delivery on or off for the registered device. Returns
    /// whether the server accepted the change.
    pub async fn set_push_enabled(&self, enabled: bool) -> bool {
        let id = match self.device_id.as_deref() {
            Some(id) => id,
            None => {
                warn!("No device id available, cannot toggle notifications");
                return false;
            }
        };

        match self.api.set_push_enabled(id, enabled).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to toggle push notifications");
                false
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
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::auth::store::use_mock_keyring;

    fn test_store(tag: &str) -> (Arc<CredentialStore>, tempfile::TempDir) {
        use_mock_keyring();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let service = format!("coindeck-push-{}-{}", tag, std::process::id());
        let store = Arc::new(CredentialStore::new(&service, dir.path()));
        (store, dir)
    }

    async fn test_registrar(
        store: &Arc<CredentialStore>,
        server: &MockServer,
    ) -> DeviceRegistrar {
        let api = ApiClient::with_base_url(Arc::clone(store), &server.uri())
            .expect("Failed to build client");
        DeviceRegistrar::new(api, Arc::clone(store))
    }

    #[tokio::test]
    async fn test_first_token_registers_and_caches_device_id() {
        let (store, _dir) = test_store("first");
        let server = MockServer::start().await;
        let mut registrar = test_registrar(&store, &server).await;

        Mock::given(method("POST"))
            .and(path("/api/user/devices"))
            .and(body_partial_json(json!({ "deviceToken": "fcm-1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "deviceId": "dev-9" })))
            .expect(1)
            .mount(&server)
            .await;

        registrar.handle_token("fcm-1").await;

        assert_eq!(registrar.device_id(), Some("dev-9"));
        assert_eq!(store.device_id().as_deref(), Some("dev-9"));
        assert_eq!(store.device_token().as_deref(), Some("fcm-1"));
    }

    #[tokio::test]
    async fn test_next_token_updates_existing_registration() {
        let (store, _dir) = test_store("update");
        store.set_device_id("dev-7");
        let server = MockServer::start().await;
        let mut registrar = test_registrar(&store, &server).await;

        Mock::given(method("PUT"))
            .and(path("/api/user/devices/dev-7"))
            .and(body_partial_json(json!({ "token": "fcm-2" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        registrar.handle_token("fcm-2").await;

        assert_eq!(registrar.device_id(), Some("dev-7"));
        assert_eq!(store.device_token().as_deref(), Some("fcm-2"));
    }

    #[tokio::test]
    async fn test_register_without_token_sends_nothing() {
        let (store, _dir) = test_store("no-token");
        let server = MockServer::start().await;
        let mut registrar = test_registrar(&store, &server).await;

        Mock::given(method("POST"))
            .and(path("/api/user/devices"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "deviceId": "dev-x" })))
            .expect(0)
            .mount(&server)
            .await;

        registrar.register().await;
        assert_eq!(registrar.device_id(), None);
    }

    #[tokio::test]
    async fn test_update_without_token_sends_nothing() {
        let (store, _dir) = test_store("update-no-token");
        store.set_device_id("dev-1");
        let server = MockServer::start().await;
        let registrar = test_registrar(&store, &server).await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        registrar.update_token().await;
    }

    #[tokio::test]
    async fn test_registration_failure_keeps_token_for_retry() {
        let (store, _dir) = test_store("server-down");
        let server = MockServer::start().await;
        let mut registrar = test_registrar(&store, &server).await;

        Mock::given(method("POST"))
            .and(path("/api/user/devices"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        registrar.handle_token("fcm-keep").await;

        assert_eq!(registrar.device_id(), None);
        assert!(registrar.has_token());
        assert_eq!(store.device_token().as_deref(), Some("fcm-keep"));
    }

    #[tokio::test]
    async fn test_toggle_pushes_state_to_server() {
        let (store, _dir) = test_store("toggle");
        store.set_device_id("dev-3");
        let server = MockServer::start().await;
        let registrar = test_registrar(&store, &server).await;

        Mock::given(method("PUT"))
            .and(path("/api/user/devices/dev-3/notifications"))
            .and(body_partial_json(json!({ "enabled": false })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        assert!(registrar.set_push_enabled(false).await);
    }

    #[tokio::test]
    async fn test_toggle_needs_a_registered_device() {
        let (store, _dir) = test_store("toggle-unregistered");
        let server = MockServer::start().await;
        let registrar = test_registrar(&store, &server).await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        assert!(!registrar.set_push_enabled(true).await);
    }
}
