// Allow dead code: generic record accessors kept for future record types
#![allow(dead_code)]

use std::collections::{hash_map, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use keyring::Entry;
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

/// Keychain service every secure record is filed under.
pub const SERVICE_NAME: &str = "coindeck";

/// Secure record: the exchange session token.
const KEY_AUTH_TOKEN: &str = "auth_token";
/// Secure record: the push transport token for this install.
const KEY_PUSH_DEVICE_TOKEN: &str = "push_device_token";
/// Plain record: the server-assigned device id from push registration.
const KEY_PUSH_DEVICE_ID: &str = "push_device_id";
/// Plain record: the serialized user preference blob.
const KEY_USER_PREFERENCES: &str = "user_preferences";

/// Two-tier local store. Secrets go to the OS keychain, everything else to
/// plain files under the app data directory.
///
/// Every operation absorbs its own failure: callers see an absent value or a
/// `false`, never an error. A broken keychain degrades the app to signed-out
/// instead of crashing it.
pub struct CredentialStore {
    service: String,
    data_dir: PathBuf,
    /// Keychain handles, one per record key, created on first use and held
    /// for the life of the store.
    entries: Mutex<HashMap<String, Entry>>,
}

impl CredentialStore {
    pub fn new(service: &str, data_dir: &Path) -> Self {
        Self {
            service: service.to_string(),
            data_dir: data_dir.to_path_buf(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    // ===== Secure records (OS keychain) =====

    /// Store a secret in the OS keychain. Returns false if the write failed.
    pub fn set_secure(&self, key: &str, value: &str) -> bool {
        match self.keychain_write(key, value) {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "Failed to write secure record");
                false
            }
        }
    }

    /// Read a secret from the OS keychain. Absent and unreadable both come
    /// back as None; only unreadable is logged.
    pub fn get_secure(&self, key: &str) -> Option<String> {
        match self.keychain_read(key) {
            Ok(value) => Some(value),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                warn!(key, error = %e, "Failed to read secure record");
                None
            }
        }
    }

    /// Delete a secret from the OS keychain. Deleting an absent record
    /// counts as success.
    pub fn remove_secure(&self, key: &str) -> bool {
        match self.keychain_delete(key) {
            Ok(()) | Err(keyring::Error::NoEntry) => true,
            Err(e) => {
                warn!(key, error = %e, "Failed to delete secure record");
                false
            }
        }
    }

    /// Run `op` against the keychain handle for `key`, creating and caching
    /// the handle on first use.
    fn with_entry<R>(
        &self,
        key: &str,
        op: impl FnOnce(&Entry) -> std::result::Result<R, keyring::Error>,
    ) -> std::result::Result<R, keyring::Error> {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let entry = match entries.entry(key.to_string()) {
            hash_map::Entry::Occupied(slot) => slot.into_mut(),
            hash_map::Entry::Vacant(slot) => slot.insert(Entry::new(&self.service, key)?),
        };
        op(entry)
    }

    fn keychain_write(&self, key: &str, value: &str) -> std::result::Result<(), keyring::Error> {
        self.with_entry(key, |entry| entry.set_password(value))
    }

    fn keychain_read(&self, key: &str) -> std::result::Result<String, keyring::Error> {
        self.with_entry(key, |entry| entry.get_password())
    }

    fn keychain_delete(&self, key: &str) -> std::result::Result<(), keyring::Error> {
        self.with_entry(key, |entry| entry.delete_credential())
    }

    // ===== Plain records (data directory) =====

    /// Store a non-secret record as a plain file.
    pub fn set_plain(&self, key: &str, value: &str) -> bool {
        match self.file_write(key, value) {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "Failed to write record file");
                false
            }
        }
    }

    pub fn get_plain(&self, key: &str) -> Option<String> {
        let path = self.record_path(key);
        if !path.exists() {
            return None;
        }
        match std::fs::read_to_string(&path) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Failed to read record file");
                None
            }
        }
    }

    pub fn remove_plain(&self, key: &str) -> bool {
        let path = self.record_path(key);
        if !path.exists() {
            return true;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "Failed to delete record file");
                false
            }
        }
    }

    fn file_write(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir).context("Failed to create data directory")?;
        std::fs::write(self.record_path(key), value).context("Failed to write record file")?;
        Ok(())
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(key)
    }

    // ===== Named records =====

    pub fn auth_token(&self) -> Option<String> {
        self.get_secure(KEY_AUTH_TOKEN)
    }

    pub fn set_auth_token(&self, token: &str) -> bool {
        self.set_secure(KEY_AUTH_TOKEN, token)
    }

    pub fn clear_auth_token(&self) -> bool {
        self.remove_secure(KEY_AUTH_TOKEN)
    }

    pub fn device_token(&self) -> Option<String> {
        self.get_secure(KEY_PUSH_DEVICE_TOKEN)
    }

    pub fn set_device_token(&self, token: &str) -> bool {
        self.set_secure(KEY_PUSH_DEVICE_TOKEN, token)
    }

    pub fn device_id(&self) -> Option<String> {
        self.get_plain(KEY_PUSH_DEVICE_ID)
    }

    pub fn set_device_id(&self, id: &str) -> bool {
        self.set_plain(KEY_PUSH_DEVICE_ID, id)
    }

    /// Deserialize the stored preference blob. Parse failures are treated
    /// the same as an absent blob.
    pub fn preferences<T: DeserializeOwned>(&self) -> Option<T> {
        let raw = self.get_plain(KEY_USER_PREFERENCES)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "Failed to parse stored preferences");
                None
            }
        }
    }

    pub fn set_preferences<T: Serialize>(&self, preferences: &T) -> bool {
        match serde_json::to_string(preferences) {
            Ok(raw) => self.set_plain(KEY_USER_PREFERENCES, &raw),
            Err(e) => {
                warn!(error = %e, "Failed to serialize preferences");
                false
            }
        }
    }
}

/// Route keychain traffic to keyring's in-memory mock for the whole test
/// process. Called by every test module that touches the keychain.
#[cfg(test)]
pub(crate) fn use_mock_keyring() {
    use std::sync::Once;
    static MOCK_KEYRING: Once = Once::new();
    MOCK_KEYRING.call_once(|| {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
    });
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    /// Each test gets its own service name so entries never collide.
    fn test_store(tag: &str) -> (CredentialStore, tempfile::TempDir) {
        use_mock_keyring();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let service = format!("coindeck-test-{}-{}", tag, std::process::id());
        let store = CredentialStore::new(&service, dir.path());
        (store, dir)
    }

    #[test]
    fn test_secure_roundtrip_and_remove() {
        let (store, _dir) = test_store("secure");

        assert_eq!(store.auth_token(), None);
        assert!(store.set_auth_token("tok-123"));
        assert_eq!(store.auth_token().as_deref(), Some("tok-123"));

        assert!(store.clear_auth_token());
        assert_eq!(store.auth_token(), None);
        // Clearing again is still a success
        assert!(store.clear_auth_token());
    }

    #[test]
    fn test_secure_records_are_independent() {
        let (store, _dir) = test_store("independent");

        assert!(store.set_auth_token("session"));
        assert!(store.set_device_token("push"));
        assert!(store.clear_auth_token());

        assert_eq!(store.auth_token(), None);
        assert_eq!(store.device_token().as_deref(), Some("push"));
    }

    #[test]
    fn test_plain_roundtrip() {
        let (store, _dir) = test_store("plain");

        assert_eq!(store.device_id(), None);
        assert!(store.set_device_id("dev-42"));
        assert_eq!(store.device_id().as_deref(), Some("dev-42"));

        assert!(store.remove_plain(KEY_PUSH_DEVICE_ID));
        assert_eq!(store.device_id(), None);
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        favorite: String,
        refresh: bool,
    }

    #[test]
    fn test_preferences_roundtrip() {
        let (store, _dir) = test_store("prefs");

        let prefs = Prefs {
            favorite: "bitcoin".to_string(),
            refresh: true,
        };
        assert!(store.set_preferences(&prefs));
        assert_eq!(store.preferences::<Prefs>(), Some(prefs));
    }

    #[test]
    fn test_corrupt_preferences_read_as_absent() {
        let (store, _dir) = test_store("corrupt");

        assert!(store.set_plain(KEY_USER_PREFERENCES, "not json"));
        assert_eq!(store.preferences::<Prefs>(), None);
    }
}
